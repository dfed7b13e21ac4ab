//! The top-down drop loop.
//!
//! Layer by layer, from the highest populated layer downward, each active
//! node either merges with a neighbour or emits a child one layer lower,
//! deflected around the avoidance field. Four phases per layer:
//!
//! A. group nodes by the connected parts of `avoidance(0, ℓ)` — group 0
//!    is "on a path to the build plate", groups ≥ 1 are trapped inside
//!    the model and route toward their corridor instead;
//! B. queue dead branches for pruning (can't reach the plate when they
//!    must, or engulfed by the model);
//! C. connect each group with a spanning tree, collapse close pairs,
//!    absorb close neighbours, then move survivors toward their
//!    neighbours within the slope budget;
//! D. insert the children, merging coincident arrivals, and propagate
//!    pruning transitively up the parent chains and merged lineages.

use super::{Forest, Node, NodeId};
use crate::clipper;
use crate::config::{SupportPlacement, TreeSupportParams};
use crate::geometry::{closest_point_on_boundary, contains_point, locate, ExPolygon, Point};
use crate::mst::MinimumSpanningTree;
use crate::progress::{CancelToken, Progress};
use crate::volumes::TreeModelVolumes;
use crate::{Coord, Result};
use std::collections::{HashMap, HashSet};

/// Extra movement headroom for rounding between radius samples (0.1 mm).
const SAMPLE_ROUNDING_SLACK: Coord = 100_000;

/// Boundary tolerance when assigning a node to an avoidance part (1 µm).
const PART_BOUNDARY_TOLERANCE: Coord = 1_000;

/// Drop every active node to the build plate, layer by layer.
pub fn drop_nodes(
    forest: &mut Forest,
    params: &TreeSupportParams,
    volumes: &TreeModelVolumes,
    progress: &Progress,
    cancel: &CancelToken,
) -> Result<()> {
    let n_layers = volumes.n_layers();
    let buildplate_only = params.config.placement == SupportPlacement::BuildplateOnly;

    // Layer 0 nodes never drop; they are the forest's roots.
    for layer in (1..n_layers).rev() {
        cancel.check()?;

        let active: Vec<NodeId> = forest.layer(layer).values().copied().collect();
        if active.is_empty() {
            progress.drop_layer_done();
            continue;
        }

        // Phase A: group by the connected parts of avoidance(0, layer).
        let parts = clipper::split_into_parts(volumes.avoidance(0, layer));
        let mut groups: Vec<Vec<NodeId>> = vec![Vec::new(); parts.len() + 1];
        let mut prune_queue: Vec<NodeId> = Vec::new();

        for &id in &active {
            let node = forest.node(id);
            // Phase B, part one: must reach the plate but no longer can.
            if buildplate_only && !node.to_buildplate {
                prune_queue.push(id);
                continue;
            }
            groups[assign_group(&parts, &node.position)].push(id);
        }

        // Phase B, part two: trapped nodes swallowed by the model. A node
        // deeper inside the collision area than its own radius has no
        // printable cross-section left.
        let collision = volumes.collision(0, layer);
        for group in groups.iter_mut().skip(1) {
            group.retain(|&id| {
                let node = forest.node(id);
                if contains_point(collision, &node.position) {
                    if let Some(boundary) = closest_point_on_boundary(collision, &node.position) {
                        let radius = node.radius.max(1) as i128;
                        if node.position.distance_squared(&boundary) >= radius * radius {
                            prune_queue.push(id);
                            return false;
                        }
                    }
                }
                true
            });
        }

        // Phase C: merge & move, one spanning tree per group.
        for (group_index, group) in groups.iter().enumerate() {
            if group.is_empty() {
                continue;
            }

            let position_of = |forest: &Forest, id: NodeId| forest.node(id).position;
            let mst =
                MinimumSpanningTree::new(group.iter().map(|&id| position_of(forest, id)));
            let id_at: HashMap<Point, NodeId> = group
                .iter()
                .map(|&id| (position_of(forest, id), id))
                .collect();

            // Nodes consumed by the merge pass drop no child of their own.
            let mut merged: HashSet<NodeId> = HashSet::new();

            // Merge pass.
            for &id in group {
                if merged.contains(&id) {
                    continue;
                }
                let position = forest.node(id).position;
                let neighbours = mst.adjacent(&position);

                if neighbours.len() == 1 {
                    // A two-node island closer than one layer's movement
                    // collapses to its midpoint.
                    let other = neighbours[0];
                    if within_move(params, position, other)
                        && mst.adjacent(&other).len() == 1
                    {
                        let other_id = id_at[&other];
                        if merged.contains(&other_id) {
                            continue;
                        }
                        collapse_dipole(
                            forest, params, volumes, group_index, layer, id, other_id,
                        );
                        merged.insert(id);
                        merged.insert(other_id);
                    }
                } else if neighbours.len() > 1 {
                    // Absorb every close neighbour into this node.
                    for &other in neighbours {
                        if !within_move(params, position, other) {
                            continue;
                        }
                        let other_id = id_at[&other];
                        if other_id == id || merged.contains(&other_id) {
                            continue;
                        }
                        absorb(forest, params, id, other_id);
                        merged.insert(other_id);
                    }
                }
            }

            // Move pass.
            for &id in group {
                if merged.contains(&id) {
                    continue;
                }
                let node = forest.node(id);
                let position = node.position;

                // Drift toward the sum of neighbour offsets, clamped to
                // the slope budget.
                let mut target = position;
                let neighbours = mst.adjacent(&position);
                if !neighbours.is_empty() {
                    let mut direction = Point::zero();
                    for &neighbour in neighbours {
                        direction += neighbour - position;
                    }
                    target = position + clamp_move(params, direction);
                }

                let distance_to_top = node.distance_to_top + 1;
                let roof_layers_below = node.roof_layers_below - 1;
                let skin_direction = node.skin_direction;
                let radius = params.radius_for(distance_to_top);
                let (child_position, to_buildplate) = route_child(
                    params, volumes, group_index, position, target, radius, layer - 1,
                );

                forest.insert_or_merge(Node {
                    position: child_position,
                    layer: layer - 1,
                    radius,
                    distance_to_top,
                    skin_direction,
                    roof_layers_below,
                    to_buildplate,
                    parent: Some(id),
                    merged_lineage: Vec::new(),
                    deleted: false,
                });
            }
        }

        // Phase D: pruning, transitively up chains and across lineages.
        for id in prune_queue {
            forest.prune(id);
        }

        progress.drop_layer_done();
    }

    // Layer 0 is processed by arriving, not by dropping.
    if n_layers > 0 {
        progress.drop_layer_done();
    }
    Ok(())
}

/// Two nodes at `a` and `b` merge into one child at their midpoint. The
/// inward push for trapped groups anchors at the midpoint, and the final
/// displacement is clamped to the slope budget from the midpoint.
fn collapse_dipole(
    forest: &mut Forest,
    params: &TreeSupportParams,
    volumes: &TreeModelVolumes,
    group_index: usize,
    layer: usize,
    id: NodeId,
    other_id: NodeId,
) {
    let node = forest.node(id);
    let other = forest.node(other_id);
    let midpoint = (node.position + other.position) / 2;

    let distance_to_top = node.distance_to_top.max(other.distance_to_top) + 1;
    let roof_layers_below = node.roof_layers_below.max(other.roof_layers_below) - 1;
    let skin_direction = node.skin_direction;
    let radius = params.radius_for(distance_to_top);
    let (child_position, to_buildplate) = route_child(
        params, volumes, group_index, midpoint, midpoint, radius, layer - 1,
    );

    forest.insert_or_merge(Node {
        position: child_position,
        layer: layer - 1,
        radius,
        distance_to_top,
        skin_direction,
        roof_layers_below,
        to_buildplate,
        parent: Some(id),
        merged_lineage: Vec::new(),
        deleted: false,
    });
    forest.node_mut(id).merged_lineage.push(other_id);
}

/// Merge `other` into `node`: component-wise maxima, lineage link.
/// `other` stays on its layer (it is a real printed node) but drops no
/// child of its own.
fn absorb(forest: &mut Forest, params: &TreeSupportParams, id: NodeId, other_id: NodeId) {
    let (other_dtt, other_roof) = {
        let other = forest.node(other_id);
        (other.distance_to_top, other.roof_layers_below)
    };
    let node = forest.node_mut(id);
    node.distance_to_top = node.distance_to_top.max(other_dtt);
    node.roof_layers_below = node.roof_layers_below.max(other_roof);
    node.merged_lineage.push(other_id);
    node.radius = params.radius_for(node.distance_to_top);
}

/// Route a child onto layer `layer_below` using its quantized radius.
/// Group 0 escapes outward from the avoidance field; trapped groups
/// retreat one step deeper into their internal corridor.
fn route_child(
    params: &TreeSupportParams,
    volumes: &TreeModelVolumes,
    group_index: usize,
    anchor: Point,
    target: Point,
    radius: Coord,
    layer_below: usize,
) -> (Point, bool) {
    let quantized = volumes.quantize(radius);
    let avoidance = volumes.avoidance(quantized, layer_below);

    let position = if group_index == 0 {
        // The avoidance boundary jumps by at most one radius sample per
        // layer of growth, so this budget always covers the escape.
        let escape_limit = params
            .max_move
            .saturating_add(params.config.radius_sample + SAMPLE_ROUNDING_SLACK);
        locate::move_toward(anchor, target, avoidance, escape_limit, SAMPLE_ROUNDING_SLACK)
    } else {
        let internal = volumes.internal(quantized, layer_below);
        match closest_point_on_boundary(internal, &anchor) {
            None => target,
            Some(boundary) => {
                // Try to retreat one step deeper into the corridor.
                let budget = (anchor.distance(&boundary) as Coord)
                    .saturating_add(params.max_move);
                let moved = locate::ensure_inside(internal, target, budget);
                anchor + clamp_move(params, moved - anchor)
            }
        }
    };

    let to_buildplate = !contains_point(avoidance, &position);
    (position, to_buildplate)
}

fn squared(v: Coord) -> i128 {
    if v == Coord::MAX {
        i128::MAX
    } else {
        (v as i128) * (v as i128)
    }
}

fn within_move(params: &TreeSupportParams, a: Point, b: Point) -> bool {
    !params.move_bounded() || a.distance_squared(&b) < squared(params.max_move)
}

fn clamp_move(params: &TreeSupportParams, displacement: Point) -> Point {
    if params.move_bounded() && displacement.length_squared() > squared(params.max_move) {
        displacement.with_length(params.max_move)
    } else {
        displacement
    }
}

/// Group 0 is "outside every part"; a node inside (or within tolerance of)
/// a part belongs to that part's group. Ties resolve to the lowest index.
fn assign_group(parts: &[ExPolygon], position: &Point) -> usize {
    let mut nearest: Option<(i128, usize)> = None;
    for (index, part) in parts.iter().enumerate() {
        if part.contains_point(position) {
            return index + 1;
        }
        let boundary = part.closest_boundary_point(position);
        let distance = position.distance_squared(&boundary);
        if nearest.map_or(true, |(best, _)| distance < best) {
            nearest = Some((distance, index));
        }
    }
    match nearest {
        Some((distance, index))
            if distance <= squared(PART_BOUNDARY_TOLERANCE) =>
        {
            index + 1
        }
        _ => 0,
    }
}
