//! Geometry primitives for support generation.
//!
//! Everything is integer: points live on a fixed-point grid scaled by
//! [`crate::SCALING_FACTOR`], polygons are implicitly closed contours, and
//! polygon sets ([`ExPolygons`]) are the currency of the boolean layer in
//! [`crate::clipper`].

mod bounding_box;
mod expolygon;
pub mod locate;
mod point;
mod polygon;

pub use bounding_box::BoundingBox;
pub use expolygon::{
    closest_point_on_boundary, contains_point, total_area, ExPolygon, ExPolygons,
};
pub use point::{Point, Points};
pub use polygon::Polygon;
