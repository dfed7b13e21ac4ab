//! Tree support integration tests.
//!
//! End-to-end scenarios through the public generator, plus the structural
//! invariants every finished forest must satisfy. Scenes are scaled-down
//! versions of real prints: a lidded box, a cantilevered arm, an
//! unreachable overhang, a tiny island.

use arbor::geometry::contains_point;
use arbor::{
    clipper, scale, BoundingBox, CancelToken, ExPolygon, ExPolygons, Forest, MeshInput, Point,
    Polygon, Progress, SupportInput, SupportPlacement, TreeModelVolumes, TreeSupport,
    TreeSupportConfig,
};

fn rect(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> ExPolygon {
    ExPolygon::new(Polygon::rectangle(
        Point::new_scale(min_x, min_y),
        Point::new_scale(max_x, max_y),
    ))
}

/// A square ring (walls of a box) as a polygon with a hole.
fn ring(min: f64, max: f64, wall: f64) -> ExPolygon {
    let mut hole = Polygon::rectangle(
        Point::new_scale(min + wall, min + wall),
        Point::new_scale(max - wall, max - wall),
    );
    hole.reverse();
    ExPolygon::with_holes(
        Polygon::rectangle(Point::new_scale(min, min), Point::new_scale(max, max)),
        vec![hole],
    )
}

fn input_for(layer_outlines: Vec<ExPolygons>, overhangs: Vec<ExPolygons>) -> SupportInput {
    let mut bounding_box = BoundingBox::new();
    for layer in overhangs.iter().chain(layer_outlines.iter()) {
        for ex in layer {
            let bb = ex.bounding_box();
            bounding_box.merge_point(bb.min);
            bounding_box.merge_point(bb.max);
        }
    }
    SupportInput {
        layer_outlines,
        meshes: vec![MeshInput {
            enabled: true,
            overhang_areas: overhangs,
            bounding_box,
        }],
    }
}

fn build_forest(
    config: &TreeSupportConfig,
    input: &SupportInput,
) -> (Forest, TreeModelVolumes, TreeSupport) {
    let tree = TreeSupport::new(config).unwrap();
    let progress = Progress::new(0, 0, None);
    let (forest, volumes) = tree
        .build_forest(input, &progress, &CancelToken::new())
        .unwrap();
    (forest, volumes, tree)
}

/// The structural invariants of a finished forest (§ collision, slope,
/// layer stepping, monotone growth).
fn assert_forest_invariants(
    forest: &Forest,
    volumes: &TreeModelVolumes,
    tree: &TreeSupport,
) {
    let params = tree.params();
    let move_slack = (params.config.radius_sample + scale(0.1)) as f64 + 2.0;

    for layer in 0..forest.n_layers() {
        for (position, &id) in forest.layer(layer) {
            let node = forest.node(id);
            assert_eq!(node.position, *position);
            assert_eq!(node.layer, layer);
            assert!(!node.is_deleted());

            // 1. Never inside the collision volume for the node's radius.
            // Branches that rest on the model are the designed exception:
            // their lower nodes live in the model's shadow and the
            // rasterizer clips them instead.
            if node.to_buildplate {
                assert!(
                    !contains_point(volumes.collision(node.radius, layer), position),
                    "node at {position:?} layer {layer} penetrates collision"
                );
            }

            // 2. Slope budget per parent edge, 3. exact layer stepping.
            if let Some(parent_id) = node.parent {
                let parent = forest.node(parent_id);
                assert_eq!(parent.layer, layer + 1);
                let moved = parent.position.distance(position);
                assert!(
                    moved <= params.max_move as f64 + move_slack,
                    "edge at layer {layer} moved {moved}"
                );

                // 6. Monotone distance-to-top and radius leafward→rootward.
                assert!(node.distance_to_top >= parent.distance_to_top);
                assert!(node.radius >= parent.radius);
            }
        }
    }
}

/// Scenario: a lidded box. Walls rise from the plate; the lid overhangs
/// the hollow interior and must be caught from inside.
fn lidded_box_scene() -> (TreeSupportConfig, SupportInput) {
    let n_layers = 30;
    let lid_layer = 27;

    let mut outlines: Vec<ExPolygons> = Vec::with_capacity(n_layers);
    let mut overhangs: Vec<ExPolygons> = vec![Vec::new(); n_layers];
    for layer in 0..n_layers {
        if layer < lid_layer {
            outlines.push(vec![ring(20.0, 34.0, 2.0)]);
        } else {
            outlines.push(vec![rect(20.0, 20.0, 34.0, 34.0)]);
        }
    }
    // The lid's unsupported underside: the box interior.
    overhangs[lid_layer] = vec![rect(22.0, 22.0, 32.0, 32.0)];

    let config = TreeSupportConfig {
        branch_distance: scale(2.0),
        placement: SupportPlacement::BuildplateOnly,
        ..Default::default()
    };
    (config, input_for(outlines, overhangs))
}

#[test]
fn test_flat_roof_overhang() {
    let (config, input) = lidded_box_scene();
    let (forest, volumes, tree) = build_forest(&config, &input);

    let seed_layer = 27 - tree.params().z_top_layers;
    let seed_count = forest.layer(seed_layer).len();
    // A 10 mm square at 2 mm spacing seeds a grid of leaves
    assert!(seed_count >= 9, "only {seed_count} leaves seeded");

    // Branches merge on the way down into fewer trunks
    let trunk_count = forest.layer(0).len();
    assert!(trunk_count >= 1);
    assert!(
        trunk_count < seed_count,
        "{seed_count} leaves never merged on the way down"
    );

    // Trunks stand on the plate inside the box, clear of the walls
    for trunk_position in forest.layer(0).keys() {
        for wall in &input.layer_outlines[0] {
            assert!(!wall.contains_point(trunk_position));
        }
    }

    assert_forest_invariants(&forest, &volumes, &tree);
}

#[test]
fn test_flat_roof_output_regions() {
    let (config, input) = lidded_box_scene();
    let tree = TreeSupport::new(&config).unwrap();
    let output = tree.generate_support_areas(&input).unwrap();

    assert!(output.generated);
    let max_filled = output.max_filled_layer.expect("no support emitted");
    assert!(max_filled >= 25 - tree.params().z_top_layers);

    // Support exists at the plate and stays inside the box interior
    let bottom = &output.layers[0];
    assert!(!bottom.infill_parts.is_empty());
    let interior = [rect(22.0, 22.0, 32.0, 32.0)];
    for part in &bottom.infill_parts {
        let part_set = [part.outline.clone()];
        let outside = clipper::difference(&part_set, &interior);
        assert!(
            arbor::geometry::total_area(&outside) < (scale(0.05) as f64).powi(2),
            "support leaks out of the box interior"
        );
    }
}

#[test]
fn test_cantilevered_arm() {
    // A pillar with a horizontal arm; branches under the arm may drift
    // but never penetrate the pillar.
    let n_layers = 25;
    let arm_layer = 20;
    let mut outlines: Vec<ExPolygons> = Vec::with_capacity(n_layers);
    let mut overhangs: Vec<ExPolygons> = vec![Vec::new(); n_layers];
    for layer in 0..n_layers {
        if layer < arm_layer {
            outlines.push(vec![rect(10.0, 10.0, 14.0, 14.0)]);
        } else {
            outlines.push(vec![rect(10.0, 10.0, 30.0, 14.0)]);
        }
    }
    overhangs[arm_layer] = vec![rect(15.0, 10.0, 30.0, 14.0)];

    let config = TreeSupportConfig {
        placement: SupportPlacement::BuildplateOnly,
        ..Default::default()
    };
    let (forest, volumes, tree) = build_forest(&config, &input_for(outlines, overhangs.clone()));

    assert!(forest.top_populated_layer().is_some());
    assert!(!forest.layer(0).is_empty(), "no branch reached the plate");
    assert_forest_invariants(&forest, &volumes, &tree);
}

/// Scenario pair: an overhang whose only landing is the model itself —
/// a wide pancake on layer 0 directly below it blocks the plate.
fn blocked_plate_scene(placement: SupportPlacement) -> (TreeSupportConfig, SupportInput) {
    let n_layers = 14;
    let mut outlines: Vec<ExPolygons> = vec![Vec::new(); n_layers];
    outlines[0] = vec![rect(10.0, 10.0, 50.0, 50.0)];
    let mut overhangs: Vec<ExPolygons> = vec![Vec::new(); n_layers];
    overhangs[12] = vec![rect(28.0, 28.0, 32.0, 32.0)];

    let config = TreeSupportConfig {
        placement,
        ..Default::default()
    };
    (config, input_for(outlines, overhangs))
}

#[test]
fn test_enclosed_overhang_buildplate_only_prunes_everything() {
    let (config, input) = blocked_plate_scene(SupportPlacement::BuildplateOnly);
    let (forest, _, tree) = build_forest(&config, &input);

    // Seeding happened, but every branch was unsupportable.
    for layer in 0..forest.n_layers() {
        assert!(forest.layer(layer).is_empty(), "survivor at layer {layer}");
    }

    let output = tree.generate_support_areas(&input).unwrap();
    assert!(output.generated);
    assert_eq!(output.max_filled_layer, None);
    assert!(output.layers.iter().all(|l| l.is_empty()));
}

#[test]
fn test_enclosed_overhang_everywhere_rests_on_model() {
    let (config, input) = blocked_plate_scene(SupportPlacement::Everywhere);
    let (forest, volumes, tree) = build_forest(&config, &input);

    // Branches survive all the way down...
    assert!(!forest.layer(0).is_empty(), "trapped branches were pruned");
    // ...and their roots sit inside the model's shadow.
    let pancake = rect(10.0, 10.0, 50.0, 50.0);
    for root_position in forest.layer(0).keys() {
        assert!(pancake.contains_point(root_position));
    }
    assert!(
        forest.live_nodes().any(|n| !n.to_buildplate),
        "trapped branches should know the plate is unreachable"
    );

    assert_forest_invariants(&forest, &volumes, &tree);
}

#[test]
fn test_tiny_part_fallback() {
    // One overhang island smaller than the grid spacing: the fallback
    // places a single contact node and that branch reaches the plate.
    let n_layers = 12;
    let outlines: Vec<ExPolygons> = vec![Vec::new(); n_layers];
    let mut overhangs: Vec<ExPolygons> = vec![Vec::new(); n_layers];
    overhangs[10] = vec![rect(20.0, 20.0, 20.5, 20.5)];

    let config = TreeSupportConfig::default();
    let (forest, volumes, tree) = build_forest(&config, &input_for(outlines, overhangs));

    let seed_layer = 10 - tree.params().z_top_layers;
    assert_eq!(forest.layer(seed_layer).len(), 1);
    assert_eq!(forest.layer(0).len(), 1);
    assert_forest_invariants(&forest, &volumes, &tree);
}

#[test]
fn test_roof_layers() {
    let n_layers = 16;
    let outlines: Vec<ExPolygons> = vec![Vec::new(); n_layers];
    let mut overhangs: Vec<ExPolygons> = vec![Vec::new(); n_layers];
    overhangs[14] = vec![rect(10.0, 10.0, 22.0, 22.0)];

    let config = TreeSupportConfig {
        roof_enabled: true,
        roof_height: scale(0.6),
        ..Default::default()
    };
    let tree = TreeSupport::new(&config).unwrap();
    let input = input_for(outlines, overhangs);
    let output = tree.generate_support_areas(&input).unwrap();

    let seed_layer = 14 - tree.params().z_top_layers;

    // The contact layer and the roof_height below it are dense interface
    for layer in (seed_layer - 3)..=seed_layer {
        assert!(
            !output.layers[layer].roof.is_empty(),
            "no roof at layer {layer}"
        );
    }
    // Beneath the interface the branches are normal support
    assert!(!output.layers[seed_layer - 5].infill_parts.is_empty());

    // Roof and support never overlap
    for layer in &output.layers {
        for part in &layer.infill_parts {
            let part_set = [part.outline.clone()];
            let overlap = clipper::intersection(&part_set, &layer.roof);
            assert!(
                arbor::geometry::total_area(&overlap) < (scale(0.02) as f64).powi(2),
                "roof and support overlap"
            );
        }
    }
}

#[test]
fn test_output_respects_z_gap() {
    // Output polygons keep clear of the model's collision area at the
    // z-gap layer below them.
    let (config, input) = lidded_box_scene();
    let tree = TreeSupport::new(&config).unwrap();
    let output = tree.generate_support_areas(&input).unwrap();

    let params = tree.params();
    let progress = Progress::new(0, 0, None);
    let (_, volumes) = tree
        .build_forest(&input, &progress, &CancelToken::new())
        .unwrap();

    for (layer, support) in output.layers.iter().enumerate() {
        let z_layer =
            (layer as i64 - params.z_bottom_layers as i64 + 1).max(0) as usize;
        if z_layer >= input.layer_outlines.len() {
            continue;
        }
        let forbidden = volumes.collision(0, z_layer);
        // Stack-preserving simplification may deviate edges by up to a
        // quarter line width; allow sliver overlap up to that order.
        let tolerance = (scale(0.5) as f64).powi(2);
        for part in &support.infill_parts {
            let part_set = [part.outline.clone()];
            let overlap = clipper::intersection(&part_set, forbidden);
            assert!(
                arbor::geometry::total_area(&overlap) < tolerance,
                "support at layer {layer} intersects the model gap"
            );
        }
    }
}

#[test]
fn test_determinism() {
    // Identical inputs produce bit-identical outputs, regardless of how
    // the parallel stages interleave.
    let (config, input) = lidded_box_scene();
    let tree = TreeSupport::new(&config).unwrap();

    let first = tree.generate_support_areas(&input).unwrap();
    let second = tree.generate_support_areas(&input).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_cancellation_discards_output() {
    let (config, input) = lidded_box_scene();
    let tree = TreeSupport::new(&config).unwrap();

    let cancel = CancelToken::new();
    cancel.cancel();
    let result = tree.generate_with(&input, None, &cancel);
    assert!(matches!(result, Err(arbor::Error::Cancelled)));
}

#[test]
fn test_progress_is_monotone_and_completes() {
    use std::sync::{Arc, Mutex};

    let (config, input) = lidded_box_scene();
    let tree = TreeSupport::new(&config).unwrap();

    let reports: Arc<Mutex<Vec<(usize, usize)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = reports.clone();
    let output = tree
        .generate_with(
            &input,
            Some(Box::new(move |stage, done, total| {
                assert_eq!(stage, "support");
                sink.lock().unwrap().push((done, total));
            })),
            &CancelToken::new(),
        )
        .unwrap();
    assert!(output.generated);

    let reports = reports.lock().unwrap();
    assert!(!reports.is_empty());
    assert!(reports.windows(2).all(|w| w[0].0 <= w[1].0));
    let &(last_done, total) = reports.last().unwrap();
    assert_eq!(last_done, total);
}

#[test]
fn test_disabled_meshes_produce_nothing() {
    let (config, mut input) = lidded_box_scene();
    input.meshes[0].enabled = false;

    let tree = TreeSupport::new(&config).unwrap();
    let output = tree.generate_support_areas(&input).unwrap();
    assert!(!output.generated);
    assert!(output.layers.iter().all(|l| l.is_empty()));
}
