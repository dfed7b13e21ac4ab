//! Contact-point seeding.
//!
//! For every mesh with tree support enabled, find the layers whose
//! overhangs need catching and drop seed nodes on a rotated grid across
//! them. The grid is rotated 22° about the mesh's AABB centre; axis
//! aligned grids systematically miss diagonal overhang edges.

use super::{Forest, Node, SupportInput};
use crate::clipper;
use crate::config::TreeSupportParams;
use crate::geometry::{contains_point, locate, BoundingBox, ExPolygon, Point};
use crate::volumes::TreeModelVolumes;
use crate::CoordF;

const GRID_ROTATION: CoordF = 22.0 * std::f64::consts::PI / 180.0;

/// Seed contact nodes for every enabled mesh. Nodes land directly in the
/// forest's per-layer maps, so the drop loop picks them up layer by layer
/// from the top.
pub fn generate_contact_points(
    forest: &mut Forest,
    params: &TreeSupportParams,
    input: &SupportInput,
    volumes: &TreeModelVolumes,
) {
    for mesh in &input.meshes {
        if !mesh.enabled {
            continue;
        }
        seed_mesh(forest, params, mesh.bounding_box, &mesh.overhang_areas, volumes);
    }
}

fn seed_mesh(
    forest: &mut Forest,
    params: &TreeSupportParams,
    bounding_box: BoundingBox,
    overhang_areas: &[crate::geometry::ExPolygons],
    volumes: &TreeModelVolumes,
) {
    if !bounding_box.is_defined() {
        return;
    }
    let grid = grid_points(params, &bounding_box);
    let half_overhang = params.half_overhang_distance;
    let half_overhang2 = (half_overhang as i128) * (half_overhang as i128);
    let z_top_layers = params.z_top_layers;

    let last_layer = overhang_areas
        .len()
        .min(forest.n_layers())
        .saturating_sub(z_top_layers);
    for layer in 1..last_layer {
        let overhang = &overhang_areas[layer + z_top_layers];
        if overhang.is_empty() {
            continue;
        }

        for part in clipper::split_into_parts(overhang) {
            let bounds = part.bounding_box().expanded(half_overhang);
            let part_set = std::slice::from_ref(&part);
            let mut added = false;

            for &candidate in &grid {
                if !bounds.contains_point(&candidate) {
                    continue;
                }
                // Candidates just off the part (between overhang islands
                // on a constant surface) get pulled inside first.
                let candidate = locate::move_inside(part_set, candidate, half_overhang2)
                    .unwrap_or(candidate);
                if contains_point(part_set, &candidate)
                    && !contains_point(volumes.collision(0, layer), &candidate)
                {
                    insert_seed(forest, params, candidate, layer, (layer + z_top_layers) % 2 == 1);
                    added = true;
                }
            }

            // Nothing hit this part: place one node anyway so isolated
            // small parts are still supported.
            if !added {
                insert_fallback_seed(forest, params, &part, bounding_box.center(), layer);
            }
        }
    }
}

fn insert_seed(
    forest: &mut Forest,
    params: &TreeSupportParams,
    position: Point,
    layer: usize,
    skin_direction: bool,
) {
    forest.insert_or_merge(Node {
        position,
        layer,
        radius: params.radius_for(0),
        distance_to_top: 0,
        skin_direction,
        roof_layers_below: params.roof_layers,
        to_buildplate: true,
        parent: None,
        merged_lineage: Vec::new(),
        deleted: false,
    });
}

fn insert_fallback_seed(
    forest: &mut Forest,
    params: &TreeSupportParams,
    part: &ExPolygon,
    mesh_center: Point,
    layer: usize,
) {
    let part_set = std::slice::from_ref(part);
    let position = locate::move_inside(part_set, mesh_center, i128::MAX).unwrap_or(mesh_center);
    insert_seed(forest, params, position, layer, layer % 2 == 1);
}

/// Candidate grid: spaced at `branch_distance`, rotated about the mesh
/// AABB centre, pre-filtered to the AABB itself.
fn grid_points(params: &TreeSupportParams, bounding_box: &BoundingBox) -> Vec<Point> {
    let spread = params.config.branch_distance;
    let center = bounding_box.center();

    // Half-extents of the AABB of the rotated AABB; the grid must cover
    // the original box in rotated coordinates.
    let (sin_a, cos_a) = GRID_ROTATION.sin_cos();
    let half_x = ((bounding_box.width() as CoordF * cos_a
        + bounding_box.height() as CoordF * sin_a)
        / 2.0) as i64;
    let half_y = ((bounding_box.width() as CoordF * sin_a
        + bounding_box.height() as CoordF * cos_a)
        / 2.0) as i64;

    let mut points = Vec::new();
    let mut x = -half_x;
    while x <= half_x {
        let mut y = -half_y;
        while y <= half_y {
            let candidate = Point::new(x, y).rotate(GRID_ROTATION) + center;
            if bounding_box.contains_point(&candidate) {
                points.push(candidate);
            }
            y += spread;
        }
        x += spread;
    }
    points
}
