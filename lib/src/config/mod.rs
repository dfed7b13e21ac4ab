//! Tree support configuration.
//!
//! [`TreeSupportConfig`] is the caller-facing scalar set, treated as
//! immutable for a run. [`TreeSupportParams`] is derived from it once and
//! carries the quantities the generator actually works in: the per-layer
//! movement budget, the per-layer radius growth fraction, layer counts for
//! the vertical gaps, and the tip taper length.

use crate::geometry::BoundingBox;
use crate::machine::{AdhesionParams, AdhesionType, BuildPlateShape};
use crate::{round_divide, round_up_divide, scale, unscale, Coord, CoordF, Error, Point, Result};
use serde::{Deserialize, Serialize};

/// Where support is allowed to rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SupportPlacement {
    /// Branches may rest on the model as well as the build plate.
    #[default]
    Everywhere,
    /// Branches must reach the build plate; trapped branches are pruned.
    BuildplateOnly,
}

/// Caller-supplied configuration for one support generation run.
///
/// Lengths are scaled coordinates, angles are radians.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeSupportConfig {
    /// Branch radius at full thickness; also the tip taper target.
    pub branch_radius: Coord,
    /// Vertical distance per layer.
    pub layer_height: Coord,
    /// Safety offset between a branch and the model in plan view.
    pub xy_distance: Coord,
    /// Maximum branch slope, measured from vertical. At or beyond 90° the
    /// horizontal movement per layer is unbounded.
    pub support_angle: CoordF,
    /// Conical growth angle of the branch radius per layer.
    pub radius_angle: CoordF,
    /// Quantization step for caching volumes by radius.
    pub radius_sample: Coord,
    /// Grid spacing of candidate contact points.
    pub branch_distance: Coord,
    /// Vertical gap between an overhang and the topmost support below it.
    pub z_distance_top: Coord,
    /// Vertical gap between the model and a support floor.
    pub z_distance_bottom: Coord,
    /// Dense interface directly under the model.
    pub roof_enabled: bool,
    pub roof_height: Coord,
    /// Dense interface where support rests on the model.
    pub floor_enabled: bool,
    pub floor_height: Coord,
    /// Vertical stride between floor samples.
    pub floor_skip: Coord,
    pub placement: SupportPlacement,
    pub buildplate_shape: BuildPlateShape,
    pub adhesion_type: AdhesionType,
    pub adhesion: AdhesionParams,
    /// Build plate extent.
    pub machine_size: BoundingBox,
    /// Forwarded to the emitted infill parts.
    pub line_width: Coord,
    pub wall_count: usize,
}

impl Default for TreeSupportConfig {
    fn default() -> Self {
        Self {
            branch_radius: scale(1.0),
            layer_height: scale(0.2),
            xy_distance: scale(0.7),
            support_angle: 40.0_f64.to_radians(),
            radius_angle: 5.0_f64.to_radians(),
            radius_sample: scale(0.5),
            branch_distance: scale(1.0),
            z_distance_top: scale(0.2),
            z_distance_bottom: scale(0.2),
            roof_enabled: false,
            roof_height: scale(0.6),
            floor_enabled: false,
            floor_height: scale(0.6),
            floor_skip: scale(0.2),
            placement: SupportPlacement::Everywhere,
            buildplate_shape: BuildPlateShape::Rectangular,
            adhesion_type: AdhesionType::None,
            adhesion: AdhesionParams::default(),
            machine_size: BoundingBox::from_points_minmax(
                Point::zero(),
                Point::new_scale(200.0, 200.0),
            ),
            line_width: scale(0.4),
            wall_count: 1,
        }
    }
}

impl TreeSupportConfig {
    fn validate(&self) -> Result<()> {
        fn positive(name: &str, v: Coord) -> Result<()> {
            if v <= 0 {
                return Err(Error::Config(format!("{name} must be positive, got {v}")));
            }
            Ok(())
        }
        fn non_negative(name: &str, v: Coord) -> Result<()> {
            if v < 0 {
                return Err(Error::Config(format!("{name} must not be negative, got {v}")));
            }
            Ok(())
        }

        positive("branch_radius", self.branch_radius)?;
        positive("layer_height", self.layer_height)?;
        positive("radius_sample", self.radius_sample)?;
        positive("branch_distance", self.branch_distance)?;
        positive("line_width", self.line_width)?;
        non_negative("xy_distance", self.xy_distance)?;
        non_negative("z_distance_top", self.z_distance_top)?;
        non_negative("z_distance_bottom", self.z_distance_bottom)?;
        non_negative("roof_height", self.roof_height)?;
        non_negative("floor_height", self.floor_height)?;

        if !self.support_angle.is_finite() || self.support_angle <= 0.0 {
            return Err(Error::Config(format!(
                "support_angle must be a positive angle, got {}",
                self.support_angle
            )));
        }
        if !self.radius_angle.is_finite()
            || self.radius_angle < 0.0
            || self.radius_angle >= std::f64::consts::FRAC_PI_2
        {
            return Err(Error::Config(format!(
                "radius_angle must lie in [0°, 90°), got {} rad",
                self.radius_angle
            )));
        }
        if self.floor_enabled && self.floor_skip <= 0 {
            return Err(Error::Config(
                "floor_skip must be positive when floors are enabled".into(),
            ));
        }
        if !self.machine_size.is_defined() {
            return Err(Error::Config("machine_size is empty".into()));
        }
        Ok(())
    }
}

/// Derived, validated parameters for a run.
#[derive(Debug, Clone)]
pub struct TreeSupportParams {
    pub config: TreeSupportConfig,
    /// Maximum plan-view displacement per layer; `Coord::MAX` when the
    /// support angle makes it unbounded.
    pub max_move: Coord,
    /// Fractional radius growth per layer of distance-to-top.
    pub radius_step: CoordF,
    /// Layers over which a fresh tip tapers up to the full branch radius.
    pub tip_layers: usize,
    /// Candidate points this close to an overhang are pulled inside.
    pub half_overhang_distance: Coord,
    /// Seeding looks this many layers above the supported layer.
    pub z_top_layers: usize,
    /// drawCircles carves the model this many layers below a branch.
    pub z_bottom_layers: usize,
    /// Roof layers rendered below a contact point (0 when disabled).
    pub roof_layers: i32,
    pub floor_layers: usize,
    pub floor_skip_layers: usize,
}

impl TreeSupportParams {
    /// Validate a configuration and derive the run parameters.
    pub fn new(config: &TreeSupportConfig) -> Result<Self> {
        config.validate()?;

        let layer_height_mm = unscale(config.layer_height);
        let bounded = config.support_angle < std::f64::consts::FRAC_PI_2;
        let max_move = if bounded {
            scale(config.support_angle.tan() * layer_height_mm)
        } else {
            Coord::MAX
        };
        if bounded && max_move <= 0 {
            return Err(Error::Config(
                "support_angle and layer_height allow no horizontal movement".into(),
            ));
        }

        let radius_step =
            config.radius_angle.sin() * config.layer_height as CoordF / config.branch_radius as CoordF;

        // Integer layer count of the taper; at least one so the ramp is
        // well defined for thin branches.
        let tip_layers = ((config.branch_radius / config.layer_height) as usize).max(1);

        let half_overhang_distance = if bounded { max_move / 2 } else { Coord::MAX / 4 };

        Ok(Self {
            max_move,
            radius_step,
            tip_layers,
            half_overhang_distance,
            z_top_layers: (round_up_divide(config.z_distance_top, config.layer_height) + 1) as usize,
            z_bottom_layers: round_up_divide(config.z_distance_bottom, config.layer_height) as usize,
            roof_layers: if config.roof_enabled {
                round_divide(config.roof_height, config.layer_height) as i32
            } else {
                0
            },
            floor_layers: round_up_divide(config.floor_height, config.layer_height) as usize,
            floor_skip_layers: (round_up_divide(config.floor_skip, config.layer_height) as usize)
                .max(1),
            config: config.clone(),
        })
    }

    /// Whether the per-layer movement budget is finite.
    #[inline]
    pub fn move_bounded(&self) -> bool {
        self.max_move != Coord::MAX
    }

    /// Branch radius for a node `distance_to_top` layers below its leaf:
    /// a linear taper across the tip region, conical growth past it.
    pub fn radius_for(&self, distance_to_top: u32) -> Coord {
        let d = distance_to_top as usize;
        let branch_radius = self.config.branch_radius as CoordF;
        if d < self.tip_layers {
            (branch_radius * d as CoordF / self.tip_layers as CoordF).round() as Coord
        } else {
            (branch_radius * (1.0 + d as CoordF * self.radius_step)).round() as Coord
        }
    }

    /// Largest radius any branch can reach over `n_layers` layers.
    pub fn max_radius(&self, n_layers: usize) -> Coord {
        (self.config.branch_radius as CoordF * (1.0 + n_layers as CoordF * self.radius_step))
            .round() as Coord
    }
}
