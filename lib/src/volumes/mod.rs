//! Collision, avoidance and internal volumes.
//!
//! A branch of radius r at layer ℓ asks three questions:
//! - **collision**: would I penetrate the model's safety offset or leave
//!   the machine here?
//! - **avoidance**: standing here, can I still reach the build plate by
//!   moving at most `max_move` per layer on the way down?
//! - **internal**: am I trapped above the model, but in a spot where I can
//!   legally rest on it?
//!
//! The answers are polygon sets, precomputed on a (radius sample × layer)
//! grid. Radius columns are independent and built in parallel; within a
//! column layer ℓ depends on layer ℓ−1, so each column is sequential.
//! Every cell is written exactly once, before any reader runs.

use crate::clipper::{self, OffsetJoinType};
use crate::config::TreeSupportParams;
use crate::geometry::ExPolygons;
use crate::progress::{CancelToken, Progress};
use crate::{Coord, Result};
use rayon::prelude::*;

/// Segments shorter than this (5 µm) are slivers the avoidance inset
/// introduces; they are smoothed away before the union.
const SMOOTH_REMOVE_LENGTH: Coord = 5_000;

/// Precomputed volume grid for one generation run.
pub struct TreeModelVolumes {
    radius_sample: Coord,
    max_radius: Coord,
    n_layers: usize,
    /// `[sample][layer]` grids; avoidance and internal are dropped by
    /// [`Self::evict_to_base`] once the drop loop no longer needs them.
    collision: Vec<Vec<ExPolygons>>,
    avoidance: Vec<Vec<ExPolygons>>,
    internal: Vec<Vec<ExPolygons>>,
    empty: ExPolygons,
}

impl TreeModelVolumes {
    /// Build the full grid.
    ///
    /// `machine_border` is unioned into every collision cell as a
    /// permanent obstacle. Cancellation is honoured between the collision
    /// and avoidance passes; progress ticks once per column per pass.
    pub fn build(
        params: &TreeSupportParams,
        layer_outlines: &[ExPolygons],
        machine_border: &ExPolygons,
        progress: &Progress,
        cancel: &CancelToken,
    ) -> Result<Self> {
        let n_layers = layer_outlines.len();
        let radius_sample = params.config.radius_sample;
        let max_radius = params.max_radius(n_layers);
        let n_samples = Self::sample_count(max_radius, radius_sample);
        let xy_distance = params.config.xy_distance;

        cancel.check()?;

        let collision: Vec<Vec<ExPolygons>> = (0..n_samples)
            .into_par_iter()
            .map(|sample| {
                let radius = sample as Coord * radius_sample;
                let column: Vec<ExPolygons> = layer_outlines
                    .iter()
                    .map(|outline| {
                        let blocked = clipper::union(outline, machine_border);
                        clipper::offset(&blocked, xy_distance + radius, OffsetJoinType::Round)
                    })
                    .collect();
                progress.column_half_done();
                column
            })
            .collect();

        cancel.check()?;

        let max_move = params.max_move;
        let move_bounded = params.move_bounded();
        let avoidance: Vec<Vec<ExPolygons>> = collision
            .par_iter()
            .map(|collision_column| {
                let column = if move_bounded {
                    propagate_column(collision_column, max_move)
                } else {
                    // Unbounded movement: any spot with a free column of
                    // air below it reaches the plate, so avoidance
                    // degenerates to collision.
                    collision_column.clone()
                };
                progress.column_half_done();
                column
            })
            .collect();

        cancel.check()?;

        let internal: Vec<Vec<ExPolygons>> = avoidance
            .par_iter()
            .zip(collision.par_iter())
            .map(|(avoidance_column, collision_column)| {
                avoidance_column
                    .iter()
                    .zip(collision_column.iter())
                    .map(|(avoid, collide)| clipper::difference(avoid, collide))
                    .collect()
            })
            .collect();

        Ok(Self {
            radius_sample,
            max_radius,
            n_layers,
            collision,
            avoidance,
            internal,
            empty: Vec::new(),
        })
    }

    fn sample_count(max_radius: Coord, radius_sample: Coord) -> usize {
        (crate::round_up_divide(max_radius, radius_sample) + 1) as usize
    }

    /// Number of radius samples in the grid.
    pub fn n_samples(&self) -> usize {
        self.collision.len()
    }

    pub fn n_layers(&self) -> usize {
        self.n_layers
    }

    /// Quantize a radius to its cached value: rounded outward (up) to the
    /// sample grid and clamped to the largest radius any branch can reach.
    /// Outward rounding keeps the cached collision a superset of the true
    /// one.
    pub fn quantize(&self, radius: Coord) -> Coord {
        self.sample_index(radius) as Coord * self.radius_sample
    }

    fn sample_index(&self, radius: Coord) -> usize {
        let clamped = radius.clamp(0, self.max_radius);
        let index = crate::round_up_divide(clamped, self.radius_sample) as usize;
        index.min(self.collision.len().saturating_sub(1))
    }

    /// Where a branch of this radius at this layer would collide.
    pub fn collision(&self, radius: Coord, layer: usize) -> &ExPolygons {
        cell(&self.collision, self.sample_index(radius), layer).unwrap_or(&self.empty)
    }

    /// Where a branch of this radius at this layer can no longer reach
    /// the build plate.
    pub fn avoidance(&self, radius: Coord, layer: usize) -> &ExPolygons {
        cell(&self.avoidance, self.sample_index(radius), layer).unwrap_or(&self.empty)
    }

    /// Where a branch of this radius must flow if it rests on the model:
    /// inside avoidance but outside collision.
    pub fn internal(&self, radius: Coord, layer: usize) -> &ExPolygons {
        cell(&self.internal, self.sample_index(radius), layer).unwrap_or(&self.empty)
    }

    /// Release everything except the radius-0 collision column, which is
    /// all drawCircles reads. The higher-radius columns dominate memory.
    pub fn evict_to_base(&mut self) {
        self.collision.truncate(1);
        self.avoidance = Vec::new();
        self.internal = Vec::new();
    }
}

fn cell<'a>(grid: &'a [Vec<ExPolygons>], sample: usize, layer: usize) -> Option<&'a ExPolygons> {
    grid.get(sample).and_then(|column| column.get(layer))
}

/// Inductive avoidance for one radius column:
/// layer 0 is collision itself; above that, a spot is unreachable if it
/// was unreachable after moving inward by `max_move`, or collides here.
fn propagate_column(collision_column: &[ExPolygons], max_move: Coord) -> Vec<ExPolygons> {
    let mut column: Vec<ExPolygons> = Vec::with_capacity(collision_column.len());
    for (layer, collision) in collision_column.iter().enumerate() {
        if layer == 0 {
            column.push(collision.clone());
            continue;
        }
        let reachable_band = clipper::offset(&column[layer - 1], -max_move, OffsetJoinType::Round);
        let reachable_band = clipper::smooth(&reachable_band, SMOOTH_REMOVE_LENGTH);
        column.push(clipper::union(&reachable_band, collision));
    }
    column
}
