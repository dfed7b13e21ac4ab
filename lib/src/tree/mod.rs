//! The tree support generator.
//!
//! A forest of nodes is seeded at overhang contact points, dropped layer
//! by layer toward the build plate ([`drop`]), and finally rasterized
//! into per-layer support polygons ([`draw`]). Nodes live in an arena and
//! are addressed by integer ids; each layer keeps a map from position to
//! id, which doubles as the coincidence check ("two branches arrived at
//! the same spot") and as a deterministic iteration order.

pub mod contact;
pub mod draw;
pub mod drop;

use crate::config::{TreeSupportConfig, TreeSupportParams};
use crate::geometry::{BoundingBox, ExPolygon, ExPolygons, Point};
use crate::machine;
use crate::progress::{CancelToken, Progress, ProgressFn};
use crate::volumes::TreeModelVolumes;
use crate::{Coord, Result};
use std::collections::BTreeMap;

/// Index of a node in its forest's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

/// One node of the support forest.
///
/// `parent` points one layer up (toward the leaf this branch hangs from);
/// `merged_lineage` lists same-layer nodes whose branches merged into
/// this one and exists solely so pruning can reach them.
#[derive(Debug, Clone)]
pub struct Node {
    pub position: Point,
    pub layer: usize,
    /// Branch radius here, from the growth formula over `distance_to_top`.
    pub radius: Coord,
    /// Layers between this node and the leaf above it. Merging takes the
    /// maximum over all merged predecessors, so this is an upper bound on
    /// true path length; only radius growth reads it.
    pub distance_to_top: u32,
    /// Orientation flag for the tip ellipse, sampled at the contact point.
    pub skin_direction: bool,
    /// Remaining layers rendered as roof; sign is retained once negative.
    pub roof_layers_below: i32,
    /// Whether a legal path to the build plate still exists from here.
    pub to_buildplate: bool,
    pub parent: Option<NodeId>,
    pub merged_lineage: Vec<NodeId>,
    deleted: bool,
}

impl Node {
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }
}

/// The support forest: an arena of nodes plus per-layer active maps.
///
/// Nodes are never removed from the arena; pruning marks them deleted and
/// unlinks them from their layer map. The maps only ever hold live nodes.
pub struct Forest {
    arena: Vec<Node>,
    layers: Vec<BTreeMap<Point, NodeId>>,
}

impl Forest {
    pub fn new(n_layers: usize) -> Self {
        Self {
            arena: Vec::new(),
            layers: vec![BTreeMap::new(); n_layers],
        }
    }

    pub fn n_layers(&self) -> usize {
        self.layers.len()
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.arena[id.0 as usize]
    }

    #[inline]
    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.arena[id.0 as usize]
    }

    /// Live nodes on a layer, keyed by position.
    pub fn layer(&self, layer: usize) -> &BTreeMap<Point, NodeId> {
        &self.layers[layer]
    }

    /// Highest layer holding any live node.
    pub fn top_populated_layer(&self) -> Option<usize> {
        (0..self.layers.len()).rev().find(|&l| !self.layers[l].is_empty())
    }

    /// All live nodes, bottom layer first.
    pub fn live_nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.layers
            .iter()
            .flat_map(move |layer| layer.values().map(move |&id| self.node(id)))
    }

    /// Insert a node on its layer. If another node already occupies the
    /// position, the arrivals merge: the survivor takes the component-wise
    /// maxima of `distance_to_top`, `roof_layers_below` and radius, and
    /// absorbs the newcomer into its lineage so pruning still reaches the
    /// newcomer's branch. Returns the id that now holds the position.
    pub fn insert_or_merge(&mut self, node: Node) -> NodeId {
        let layer = node.layer;
        let position = node.position;

        let id = NodeId(self.arena.len() as u32);
        self.arena.push(node);

        match self.layers[layer].get(&position) {
            None => {
                self.layers[layer].insert(position, id);
                id
            }
            Some(&survivor_id) => {
                let (dtt, roof, radius) = {
                    let newcomer = self.node(id);
                    (
                        newcomer.distance_to_top,
                        newcomer.roof_layers_below,
                        newcomer.radius,
                    )
                };
                let survivor = self.node_mut(survivor_id);
                survivor.distance_to_top = survivor.distance_to_top.max(dtt);
                survivor.roof_layers_below = survivor.roof_layers_below.max(roof);
                survivor.radius = survivor.radius.max(radius);
                survivor.merged_lineage.push(id);
                survivor_id
            }
        }
    }

    /// Remove an unsupportable branch: walk from `start` upward through
    /// parent links, unlinking every node met, and recurse through merged
    /// lineages. Transitive, halts at roots and at already-pruned nodes.
    pub fn prune(&mut self, start: NodeId) {
        let mut queue = vec![start];
        while let Some(id) = queue.pop() {
            let mut current = Some(id);
            while let Some(node_id) = current {
                let node = self.node_mut(node_id);
                if node.deleted {
                    break;
                }
                node.deleted = true;
                let layer = node.layer;
                let position = node.position;
                current = node.parent;
                queue.extend(node.merged_lineage.iter().copied());

                if self.layers[layer].get(&position) == Some(&node_id) {
                    self.layers[layer].remove(&position);
                }
            }
        }
    }
}

/// Per-mesh input: the slicer tells the generator whether tree support is
/// enabled for the mesh and hands over its overhangs.
#[derive(Debug, Clone)]
pub struct MeshInput {
    pub enabled: bool,
    /// Regions requiring support, indexed by layer.
    pub overhang_areas: Vec<ExPolygons>,
    /// Plan-view AABB of the mesh; anchors the contact-point grid.
    pub bounding_box: BoundingBox,
}

/// Everything the generator consumes from the slicer.
#[derive(Debug, Clone, Default)]
pub struct SupportInput {
    /// Model footprint per layer, including walls.
    pub layer_outlines: Vec<ExPolygons>,
    pub meshes: Vec<MeshInput>,
}

/// One connected region of printable support on a layer.
#[derive(Debug, Clone, PartialEq)]
pub struct SupportInfillPart {
    pub outline: ExPolygon,
    pub line_width: Coord,
    pub wall_count: usize,
}

/// Support geometry for one layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SupportLayer {
    pub infill_parts: Vec<SupportInfillPart>,
    pub roof: ExPolygons,
    pub floor: ExPolygons,
}

impl SupportLayer {
    pub fn is_empty(&self) -> bool {
        self.infill_parts.is_empty() && self.roof.is_empty() && self.floor.is_empty()
    }
}

/// Result of a generation run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SupportOutput {
    pub layers: Vec<SupportLayer>,
    /// Highest layer with any support, `None` when nothing was emitted.
    pub max_filled_layer: Option<usize>,
    /// True only on successful completion.
    pub generated: bool,
}

impl SupportOutput {
    fn empty(n_layers: usize) -> Self {
        Self {
            layers: vec![SupportLayer::default(); n_layers],
            max_filled_layer: None,
            generated: false,
        }
    }
}

/// The tree support generator for one configuration.
pub struct TreeSupport {
    params: TreeSupportParams,
    machine_border: ExPolygons,
}

impl TreeSupport {
    /// Validate the configuration and compute the machine border.
    pub fn new(config: &TreeSupportConfig) -> Result<Self> {
        let params = TreeSupportParams::new(config)?;
        let machine_border = machine::machine_border(
            config.buildplate_shape,
            config.adhesion_type,
            &config.adhesion,
            &config.machine_size,
        )?;
        Ok(Self {
            params,
            machine_border,
        })
    }

    pub fn params(&self) -> &TreeSupportParams {
        &self.params
    }

    /// Generate support areas with no progress reporting or cancellation.
    pub fn generate_support_areas(&self, input: &SupportInput) -> Result<SupportOutput> {
        self.generate_with(input, None, &CancelToken::new())
    }

    /// Generate support areas, reporting weighted progress and honouring
    /// cancellation at stage and layer boundaries. Cancellation discards
    /// all partial output.
    pub fn generate_with(
        &self,
        input: &SupportInput,
        progress_callback: Option<Box<ProgressFn>>,
        cancel: &CancelToken,
    ) -> Result<SupportOutput> {
        let n_layers = input.layer_outlines.len();
        if n_layers == 0 || !input.meshes.iter().any(|m| m.enabled) {
            return Ok(SupportOutput::empty(n_layers));
        }

        let progress = Progress::new(
            self.planned_samples(n_layers),
            n_layers,
            progress_callback,
        );

        let (forest, mut volumes) = self.build_forest(input, &progress, cancel)?;

        volumes.evict_to_base();
        cancel.check()?;

        let mut output = draw::draw_circles(
            &forest,
            &self.params,
            &volumes,
            &input.layer_outlines,
            &progress,
        );
        output.generated = true;
        log::debug!(
            "tree support generated up to layer {:?}",
            output.max_filled_layer
        );
        Ok(output)
    }

    /// Run the volume, seeding and drop stages, returning the forest and
    /// the volume cache. Exposed so callers can inspect the forest before
    /// rasterization.
    pub fn build_forest(
        &self,
        input: &SupportInput,
        progress: &Progress,
        cancel: &CancelToken,
    ) -> Result<(Forest, TreeModelVolumes)> {
        let volumes = TreeModelVolumes::build(
            &self.params,
            &input.layer_outlines,
            &self.machine_border,
            progress,
            cancel,
        )?;
        cancel.check()?;

        let mut forest = Forest::new(input.layer_outlines.len());
        contact::generate_contact_points(&mut forest, &self.params, input, &volumes);
        cancel.check()?;

        drop::drop_nodes(&mut forest, &self.params, &volumes, progress, cancel)?;
        Ok((forest, volumes))
    }

    /// Radius sample count, for progress weighting.
    fn planned_samples(&self, n_layers: usize) -> usize {
        let max_radius = self.params.max_radius(n_layers);
        (crate::round_up_divide(max_radius, self.params.config.radius_sample) + 1) as usize
    }
}
