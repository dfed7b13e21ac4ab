//! # Arbor
//!
//! Tree support generation for fused-filament 3D printing slicers.
//!
//! Given per-layer model outlines and per-layer overhang regions, this
//! library synthesizes branching scaffolding that rises from the build
//! plate (or the model) to catch overhangs, and emits per-layer support
//! polygons partitioned into normal support, support roof and support
//! floor. It does not slice meshes and it does not emit toolpaths; both
//! sides of that pipeline are the caller's concern.
//!
//! ## Example
//!
//! ```rust,ignore
//! use arbor::{SupportInput, TreeSupport, TreeSupportConfig};
//!
//! let config = TreeSupportConfig::default();
//! let tree = TreeSupport::new(&config)?;
//! let output = tree.generate_support_areas(&input)?;
//! for (layer, support) in output.layers.iter().enumerate() {
//!     // hand support.infill_parts / support.roof / support.floor downstream
//! }
//! ```

pub mod clipper;
pub mod config;
pub mod geometry;
pub mod machine;
pub mod mst;
pub mod progress;
pub mod tree;
pub mod volumes;

// Re-export commonly used types
pub use clipper::{
    difference, intersection, offset, split_into_parts, union, union_all, OffsetJoinType,
};
pub use config::{SupportPlacement, TreeSupportConfig, TreeSupportParams};
pub use geometry::{BoundingBox, ExPolygon, ExPolygons, Point, Polygon};
pub use machine::{machine_border, AdhesionParams, AdhesionType, BuildPlateShape};
pub use mst::MinimumSpanningTree;
pub use progress::{CancelToken, Progress, ProgressFn};
pub use tree::{
    Forest, MeshInput, Node, NodeId, SupportInfillPart, SupportInput, SupportLayer, SupportOutput,
    TreeSupport,
};
pub use volumes::TreeModelVolumes;

/// Coordinate type used throughout the crate.
/// Integer coordinates scaled by `SCALING_FACTOR` to avoid floating-point
/// precision issues in boolean geometry.
pub type Coord = i64;

/// Floating-point coordinate type for unscaled (mm) values.
pub type CoordF = f64;

/// Scaling factor: 1 mm = 1_000_000 coordinate units.
pub const SCALING_FACTOR: f64 = 1_000_000.0;

/// Scale a floating-point millimetre value to integer coordinates.
#[inline]
pub fn scale(v: CoordF) -> Coord {
    (v * SCALING_FACTOR).round() as Coord
}

/// Unscale an integer coordinate to millimetres.
#[inline]
pub fn unscale(v: Coord) -> CoordF {
    v as CoordF / SCALING_FACTOR
}

/// Integer division rounding up. `b` must be positive.
#[inline]
pub fn round_up_divide(a: Coord, b: Coord) -> Coord {
    (a + b - 1) / b
}

/// Integer division rounding to nearest. `b` must be positive.
#[inline]
pub fn round_divide(a: Coord, b: Coord) -> Coord {
    (a + b / 2) / b
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for support generation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid geometry: {0}")]
    Geometry(String),

    #[error("cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaling() {
        assert_eq!(scale(1.0), 1_000_000);
        assert!((unscale(1_000_000) - 1.0).abs() < 1e-10);

        // Sub-millimetre precision
        assert_eq!(scale(0.001), 1_000);
        assert_eq!(scale(0.0001), 100);
    }

    #[test]
    fn test_round_up_divide() {
        assert_eq!(round_up_divide(10, 5), 2);
        assert_eq!(round_up_divide(11, 5), 3);
        assert_eq!(round_up_divide(0, 5), 0);
    }

    #[test]
    fn test_round_divide() {
        assert_eq!(round_divide(10, 4), 3);
        assert_eq!(round_divide(9, 4), 2);
        assert_eq!(round_divide(600_000, 200_000), 3);
    }
}
