//! drawCircles: rasterizing the forest into per-layer support polygons.
//!
//! Every node stamps a polygon onto its layer — a sheared ellipse while
//! the branch is still a tapering tip, a uniformly grown circle once it
//! is past the taper. Stamps are unioned, split between roof and normal
//! support, carved away from the model's z-gap, optionally floored, and
//! finally split into connected infill parts. Layers are independent;
//! one task per layer.

use super::{Forest, SupportInfillPart, SupportLayer, SupportOutput};
use crate::clipper;
use crate::config::TreeSupportParams;
use crate::geometry::{ExPolygon, ExPolygons, Point, Polygon};
use crate::progress::Progress;
use crate::volumes::TreeModelVolumes;
use crate::{Coord, CoordF};
use rayon::prelude::*;

/// Vertex count of the canonical branch circle.
const CIRCLE_RESOLUTION: usize = 10;

/// Clearance added around floors before subtracting them from the
/// support (10 µm).
const FLOOR_CLEARANCE: Coord = 10_000;

/// Rasterize the forest. Reads only the radius-0 collision column of the
/// volumes, so the cache may already be evicted to its base.
pub fn draw_circles(
    forest: &Forest,
    params: &TreeSupportParams,
    volumes: &TreeModelVolumes,
    layer_outlines: &[ExPolygons],
    progress: &Progress,
) -> SupportOutput {
    let n_layers = forest.n_layers();
    let branch_radius = params.config.branch_radius as CoordF;

    // One canonical circle; every stamp is a linear image of it.
    let branch_circle: Vec<Point> = (0..CIRCLE_RESOLUTION)
        .map(|i| {
            let angle = i as CoordF / CIRCLE_RESOLUTION as CoordF * 2.0 * std::f64::consts::PI;
            Point::new(
                (angle.cos() * branch_radius).round() as Coord,
                (angle.sin() * branch_radius).round() as Coord,
            )
        })
        .collect();
    let circle_side_length =
        (2.0 * branch_radius * (std::f64::consts::PI / CIRCLE_RESOLUTION as CoordF).sin()) as Coord;

    let layers: Vec<SupportLayer> = (0..n_layers)
        .into_par_iter()
        .map(|layer| {
            let result = draw_layer(
                forest,
                params,
                volumes,
                layer_outlines,
                &branch_circle,
                circle_side_length,
                layer,
            );
            progress.draw_layer_done();
            result
        })
        .collect();

    let max_filled_layer = (0..n_layers).rev().find(|&l| !layers[l].is_empty());

    SupportOutput {
        layers,
        max_filled_layer,
        generated: false,
    }
}

fn draw_layer(
    forest: &Forest,
    params: &TreeSupportParams,
    volumes: &TreeModelVolumes,
    layer_outlines: &[ExPolygons],
    branch_circle: &[Point],
    circle_side_length: Coord,
    layer: usize,
) -> SupportLayer {
    let nodes = forest.layer(layer);
    if nodes.is_empty() {
        return SupportLayer::default();
    }

    let mut support_stamps: ExPolygons = Vec::new();
    let mut roof_stamps: ExPolygons = Vec::new();
    for &id in nodes.values() {
        let node = forest.node(id);
        let stamp = node_stamp(params, branch_circle, node);
        if node.roof_layers_below >= 0 {
            roof_stamps.push(stamp);
        } else {
            support_stamps.push(stamp);
        }
    }

    let mut support = clipper::union_all(&support_stamps);
    let mut roof = clipper::union_all(&roof_stamps);
    support = clipper::difference(&support, &roof);

    // Carve the vertical gap to the model below.
    let z_collision_layer =
        (layer as i64 - params.z_bottom_layers as i64 + 1).max(0) as usize;
    let model_below = volumes.collision(0, z_collision_layer);
    support = clipper::difference(&support, model_below);
    roof = clipper::difference(&roof, model_below);

    // Smooth as much as possible without altering single circles: drop
    // edges shorter than the side length any circle can still have here,
    // deviating at most a quarter line so stacked layers keep bonding.
    let n_layers = forest.n_layers();
    let remaining_growth = (n_layers.saturating_sub(layer + params.tip_layers)) as CoordF
        * params.radius_step;
    let min_segment = (circle_side_length as CoordF * (1.0 + remaining_growth)) as Coord;
    support = clipper::simplify(&support, min_segment, params.config.line_width / 4);

    let floor = if params.config.floor_enabled {
        let floor = collect_floor(params, layer_outlines, &support, layer);
        support = clipper::difference(
            &support,
            &clipper::offset(&floor, FLOOR_CLEARANCE, clipper::OffsetJoinType::Round),
        );
        floor
    } else {
        Vec::new()
    };

    let infill_parts = clipper::split_into_parts(&support)
        .into_iter()
        .map(|outline| SupportInfillPart {
            outline,
            line_width: params.config.line_width,
            wall_count: params.config.wall_count,
        })
        .collect();

    SupportLayer {
        infill_parts,
        roof,
        floor,
    }
}

/// The polygon a single node stamps onto its layer.
fn node_stamp(params: &TreeSupportParams, branch_circle: &[Point], node: &super::Node) -> ExPolygon {
    let tip_layers = params.tip_layers as u32;
    let mut points = Vec::with_capacity(branch_circle.len());

    if node.distance_to_top < tip_layers {
        // Tip: shear the circle into an ellipse oriented by the skin
        // direction. The two orientations are chiral images with equal
        // determinant, so both ellipses have the same area, rotated 90°.
        let s = (node.distance_to_top + 1) as CoordF / tip_layers as CoordF;
        let major = 0.5 + s / 2.0;
        let minor = 0.5 - s / 2.0;
        for corner in branch_circle {
            let x = corner.x as CoordF;
            let y = corner.y as CoordF;
            let sheared = if node.skin_direction {
                Point::new(
                    (x * major + y * minor).round() as Coord,
                    (x * minor + y * major).round() as Coord,
                )
            } else {
                Point::new(
                    (x * major - y * minor).round() as Coord,
                    (-x * minor + y * major).round() as Coord,
                )
            };
            points.push(node.position + sheared);
        }
    } else {
        let scale_factor =
            1.0 + (node.distance_to_top - tip_layers) as CoordF * params.radius_step;
        for corner in branch_circle {
            points.push(node.position + *corner * scale_factor);
        }
    }

    ExPolygon::new(Polygon::from_points(points))
}

/// Accumulate the floor: intersections of this layer's support with the
/// model a few layers further down, sampled every `floor_skip_layers`
/// plus once at the full floor height.
fn collect_floor(
    params: &TreeSupportParams,
    layer_outlines: &[ExPolygons],
    support: &ExPolygons,
    layer: usize,
) -> ExPolygons {
    let mut floor: ExPolygons = Vec::new();
    let mut sample = |layers_below: usize| {
        let sample_layer = layer.saturating_sub(layers_below + params.z_bottom_layers);
        if let Some(outline) = layer_outlines.get(sample_layer) {
            floor.extend(clipper::intersection(support, outline));
        }
    };

    let mut layers_below = 0;
    while layers_below < params.floor_layers {
        sample(layers_below);
        layers_below += params.floor_skip_layers;
    }
    sample(params.floor_layers);

    clipper::union_all(&floor)
}
