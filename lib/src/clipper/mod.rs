//! Polygon boolean operations and offsetting.
//!
//! This module wraps the geo-clipper library behind the crate's own
//! [`ExPolygons`] type. The volumes cache and the rasterizer are built
//! entirely out of these operations:
//! - union / intersection / difference of polygon sets
//! - offsetting (Minkowski sum with a disk, round joins)
//! - connected-part splitting
//!
//! Coordinates cross the boundary as millimetre f64 values; the clipper
//! factor of 1000.0 keeps micrometre resolution through the conversion.
//! Degenerate fragments coming back from the clipper (contours with fewer
//! than three vertices or near-zero area) are logged and dropped rather
//! than surfaced — a malformed layer loses its support, the run continues.

use crate::geometry::{ExPolygon, ExPolygons, Point, Polygon};
use crate::{scale, unscale, Coord, CoordF};
use geo::{Coord as GeoCoord, LineString, MultiPolygon, Polygon as GeoPolygon};
use geo_clipper::{Clipper, EndType, JoinType};

/// Precision factor handed to the clipper (1000.0 = micrometres).
const CLIPPER_FACTOR: f64 = 1000.0;

/// Fragments below this area (scaled units²) are noise from the clipper.
const DEGENERATE_AREA: CoordF = 1.0;

/// Join type for offset corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetJoinType {
    /// Square corners
    Square,
    /// Round corners (Minkowski sum with a disk)
    #[default]
    Round,
    /// Mitered corners
    Miter,
}

impl From<OffsetJoinType> for JoinType {
    fn from(jt: OffsetJoinType) -> Self {
        match jt {
            OffsetJoinType::Square => JoinType::Square,
            OffsetJoinType::Round => JoinType::Round(0.25),
            OffsetJoinType::Miter => JoinType::Miter(2.0),
        }
    }
}

fn ring_to_geo(poly: &Polygon) -> LineString<f64> {
    let mut ring: Vec<GeoCoord<f64>> = poly
        .points()
        .iter()
        .map(|p| GeoCoord {
            x: unscale(p.x),
            y: unscale(p.y),
        })
        .collect();

    // geo rings are explicitly closed
    if let (Some(first), Some(last)) = (ring.first().copied(), ring.last()) {
        if &first != last {
            ring.push(first);
        }
    }
    LineString::new(ring)
}

fn expolygon_to_geo(expoly: &ExPolygon) -> GeoPolygon<f64> {
    let holes = expoly.holes.iter().map(ring_to_geo).collect();
    GeoPolygon::new(ring_to_geo(&expoly.contour), holes)
}

fn expolygons_to_geo(expolys: &[ExPolygon]) -> MultiPolygon<f64> {
    MultiPolygon::new(expolys.iter().map(expolygon_to_geo).collect())
}

fn ring_from_geo(ring: &LineString<f64>) -> Polygon {
    let mut points: Vec<Point> = ring
        .coords()
        .map(|c| Point::new(scale(c.x), scale(c.y)))
        .collect();

    // Strip the closing point; our polygons are implicitly closed
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    Polygon::from_points(points)
}

fn expolygons_from_geo(multi: &MultiPolygon<f64>) -> ExPolygons {
    let mut result = Vec::with_capacity(multi.0.len());
    for geo_poly in &multi.0 {
        let contour = ring_from_geo(geo_poly.exterior());
        if contour.len() < 3 || contour.area() < DEGENERATE_AREA {
            log::warn!("dropping degenerate contour from clipper output");
            continue;
        }
        let holes = geo_poly
            .interiors()
            .iter()
            .map(ring_from_geo)
            .filter(|h| h.len() >= 3)
            .collect();
        result.push(ExPolygon::with_holes(contour, holes));
    }
    result
}

// ============================================================================
// Boolean operations
// ============================================================================

/// Union of two polygon sets.
pub fn union(subject: &[ExPolygon], clip: &[ExPolygon]) -> ExPolygons {
    if subject.is_empty() {
        return clip.to_vec();
    }
    if clip.is_empty() {
        return subject.to_vec();
    }

    let result = expolygons_to_geo(subject).union(&expolygons_to_geo(clip), CLIPPER_FACTOR);
    expolygons_from_geo(&result)
}

/// Union of a single set of potentially overlapping polygons.
///
/// Splits the set and unions the halves, so a layer of many overlapping
/// branch circles resolves in a logarithmic number of clipper calls.
pub fn union_all(polygons: &[ExPolygon]) -> ExPolygons {
    match polygons.len() {
        0 => vec![],
        1 => polygons.to_vec(),
        _ => {
            let (left, right) = polygons.split_at(polygons.len() / 2);
            union(&union_all(left), &union_all(right))
        }
    }
}

/// Intersection of two polygon sets.
pub fn intersection(subject: &[ExPolygon], clip: &[ExPolygon]) -> ExPolygons {
    if subject.is_empty() || clip.is_empty() {
        return vec![];
    }

    let result = expolygons_to_geo(subject).intersection(&expolygons_to_geo(clip), CLIPPER_FACTOR);
    expolygons_from_geo(&result)
}

/// Difference of two polygon sets (subject − clip).
pub fn difference(subject: &[ExPolygon], clip: &[ExPolygon]) -> ExPolygons {
    if subject.is_empty() {
        return vec![];
    }
    if clip.is_empty() {
        return subject.to_vec();
    }

    let result = expolygons_to_geo(subject).difference(&expolygons_to_geo(clip), CLIPPER_FACTOR);
    expolygons_from_geo(&result)
}

// ============================================================================
// Offsetting
// ============================================================================

/// Offset a polygon set by `delta` scaled units. Positive grows, negative
/// shrinks; holes move the opposite way, as the Minkowski sum demands.
pub fn offset(expolygons: &[ExPolygon], delta: Coord, join_type: OffsetJoinType) -> ExPolygons {
    if expolygons.is_empty() {
        return vec![];
    }
    if delta == 0 {
        return expolygons.to_vec();
    }

    let result = expolygons_to_geo(expolygons).offset(
        unscale(delta),
        join_type.into(),
        EndType::ClosedPolygon,
        CLIPPER_FACTOR,
    );
    expolygons_from_geo(&result)
}

// ============================================================================
// Set utilities
// ============================================================================

/// Split a polygon set into connected parts.
///
/// Overlapping members are unioned first; each resulting region (contour
/// plus its holes) is one part.
pub fn split_into_parts(expolygons: &[ExPolygon]) -> Vec<ExPolygon> {
    union_all(expolygons)
}

/// Remove micrometre slivers from every contour of a set: segments shorter
/// than `shortest` whose removal deviates by less than `shortest`.
pub fn smooth(expolygons: &[ExPolygon], shortest: Coord) -> ExPolygons {
    expolygons
        .iter()
        .filter_map(|ex| {
            let contour = ex.contour.smoothed(shortest);
            if contour.len() < 3 {
                return None;
            }
            let holes = ex
                .holes
                .iter()
                .map(|h| h.smoothed(shortest))
                .filter(|h| h.len() >= 3)
                .collect();
            Some(ExPolygon::with_holes(contour, holes))
        })
        .collect()
}

/// Simplify every contour of a set with an edge-length floor and a
/// deviation ceiling. Regions that collapse are dropped.
pub fn simplify(expolygons: &[ExPolygon], min_segment: Coord, max_deviation: Coord) -> ExPolygons {
    expolygons
        .iter()
        .filter_map(|ex| {
            let contour = ex.contour.simplified(min_segment, max_deviation);
            if contour.len() < 3 {
                return None;
            }
            let holes = ex
                .holes
                .iter()
                .map(|h| h.simplified(min_segment, max_deviation))
                .filter(|h| h.len() >= 3)
                .collect();
            Some(ExPolygon::with_holes(contour, holes))
        })
        .collect()
}
