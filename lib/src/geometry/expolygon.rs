//! Polygons with holes.

use super::{BoundingBox, Point, Polygon};
use crate::CoordF;
use serde::{Deserialize, Serialize};

/// A polygon with holes: an exterior contour plus interior hole contours.
///
/// The contour should be counter-clockwise, holes clockwise. One
/// `ExPolygon` is always a single connected region, so a polygon set that
/// has been through a boolean union is "split into parts" simply by
/// looking at its members.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExPolygon {
    pub contour: Polygon,
    pub holes: Vec<Polygon>,
}

impl ExPolygon {
    #[inline]
    pub fn new(contour: Polygon) -> Self {
        Self {
            contour,
            holes: Vec::new(),
        }
    }

    #[inline]
    pub fn with_holes(contour: Polygon, holes: Vec<Polygon>) -> Self {
        Self { contour, holes }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.contour.is_empty()
    }

    /// Area of the region: contour area minus hole areas.
    pub fn area(&self) -> CoordF {
        let holes_area: CoordF = self.holes.iter().map(|h| h.area()).sum();
        self.contour.area() - holes_area
    }

    #[inline]
    pub fn bounding_box(&self) -> BoundingBox {
        self.contour.bounding_box()
    }

    /// Inside the contour and not inside any hole.
    pub fn contains_point(&self, p: &Point) -> bool {
        if !self.contour.contains_point(p) {
            return false;
        }
        for hole in &self.holes {
            if hole.contains_point(p) {
                return false;
            }
        }
        true
    }

    /// Closest point on any boundary (contour or hole) to `p`.
    pub fn closest_boundary_point(&self, p: &Point) -> Point {
        let mut best = self.contour.closest_point(p);
        let mut best_dist = p.distance_squared(&best);
        for hole in &self.holes {
            let candidate = hole.closest_point(p);
            let dist = p.distance_squared(&candidate);
            if dist < best_dist {
                best_dist = dist;
                best = candidate;
            }
        }
        best
    }

    pub fn translate(&mut self, v: Point) {
        self.contour.translate(v);
        for hole in &mut self.holes {
            hole.translate(v);
        }
    }
}

impl From<Polygon> for ExPolygon {
    fn from(contour: Polygon) -> Self {
        Self::new(contour)
    }
}

/// A polygon set: zero or more disjoint regions with holes, closed under
/// the boolean operations in [`crate::clipper`].
pub type ExPolygons = Vec<ExPolygon>;

/// Check whether a point lies inside any region of the set.
pub fn contains_point(set: &[ExPolygon], p: &Point) -> bool {
    set.iter().any(|ex| ex.contains_point(p))
}

/// Closest point on any boundary of the set to `p`, or `None` for an
/// empty set.
pub fn closest_point_on_boundary(set: &[ExPolygon], p: &Point) -> Option<Point> {
    let mut best: Option<Point> = None;
    let mut best_dist = i128::MAX;
    for ex in set {
        if ex.is_empty() {
            continue;
        }
        let candidate = ex.closest_boundary_point(p);
        let dist = p.distance_squared(&candidate);
        if dist < best_dist {
            best_dist = dist;
            best = Some(candidate);
        }
    }
    best
}

/// Total area of the set.
pub fn total_area(set: &[ExPolygon]) -> CoordF {
    set.iter().map(|ex| ex.area()).sum()
}
