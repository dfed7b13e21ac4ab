//! Moving points relative to polygon sets.
//!
//! The drop loop and the contact-point seeder never mutate polygons; they
//! nudge candidate points until they sit on the correct side of a
//! boundary. These helpers implement that vocabulary: move a point inside
//! a region, push it out of a forbidden region, or walk it toward a
//! target without entering one.

use super::expolygon::{closest_point_on_boundary, contains_point};
use super::{ExPolygon, Point};
use crate::Coord;

/// How far past a boundary a nudged point lands. Keeps integer ray casts
/// away from exact-boundary ambiguity; geometrically negligible (1 µm).
const BOUNDARY_NUDGE: Coord = 1_000;

/// Move `p` inside the set if it is not already, travelling at most
/// `max_dist2` (squared). Returns `None` when the set is empty or the
/// boundary is too far away.
pub fn move_inside(set: &[ExPolygon], p: Point, max_dist2: i128) -> Option<Point> {
    if contains_point(set, &p) {
        return Some(p);
    }

    let boundary = closest_point_on_boundary(set, &p)?;
    if p.distance_squared(&boundary) > max_dist2 {
        return None;
    }

    // Continue through the boundary point so the result is strictly interior.
    let direction = boundary - p;
    let candidate = if direction == Point::zero() {
        boundary
    } else {
        boundary + direction.with_length(BOUNDARY_NUDGE)
    };
    Some(candidate)
}

/// Push `p` out of the set if it is inside, landing `clearance` beyond the
/// nearest boundary. If the escape would travel farther than `max_dist2`
/// (squared), `p` is returned unchanged.
pub fn move_outside(set: &[ExPolygon], p: Point, clearance: Coord, max_dist2: i128) -> Point {
    if !contains_point(set, &p) {
        return p;
    }

    let Some(boundary) = closest_point_on_boundary(set, &p) else {
        return p;
    };

    let direction = boundary - p;
    let candidate = if direction == Point::zero() {
        boundary
    } else {
        boundary + direction.with_length(clearance.max(BOUNDARY_NUDGE))
    };

    if p.distance_squared(&candidate) > max_dist2 {
        return p;
    }
    candidate
}

/// Make `p` lie inside the set, travelling at most `max_dist`. Used to
/// retreat a branch deeper into an interior corridor; returns `p`
/// unchanged when that is impossible.
pub fn ensure_inside(set: &[ExPolygon], p: Point, max_dist: Coord) -> Point {
    let max_dist2 = (max_dist as i128) * (max_dist as i128);
    move_inside(set, p, max_dist2).unwrap_or(p)
}

/// Walk from `p` toward `target`, at most `limit` far, then escape
/// `invalid` with the given boundary `clearance` if the walk landed
/// inside it. The escape is bounded by `limit` as well, so the result is
/// within `2·limit` of `p` and, when possible, outside `invalid`.
pub fn move_toward(
    p: Point,
    target: Point,
    invalid: &[ExPolygon],
    limit: Coord,
    clearance: Coord,
) -> Point {
    let diff = target - p;
    let limit2 = (limit as i128) * (limit as i128);
    let candidate = if diff.length_squared() > limit2 {
        p + diff.with_length(limit)
    } else {
        target
    };

    move_outside(invalid, candidate, clearance, limit2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Polygon;

    fn square_set(min: i64, max: i64) -> Vec<ExPolygon> {
        vec![ExPolygon::new(Polygon::rectangle(
            Point::new(min, min),
            Point::new(max, max),
        ))]
    }

    #[test]
    fn test_move_inside_noop_when_inside() {
        let set = square_set(0, 100_000);
        let p = Point::new(50_000, 50_000);
        assert_eq!(move_inside(&set, p, i128::MAX), Some(p));
    }

    #[test]
    fn test_move_inside_from_outside() {
        let set = square_set(0, 100_000);
        let p = Point::new(50_000, -20_000);
        let moved = move_inside(&set, p, i128::MAX).unwrap();
        assert!(contains_point(&set, &moved));
        assert!(moved.distance(&p) < 25_000.0);
    }

    #[test]
    fn test_move_inside_too_far() {
        let set = square_set(0, 100_000);
        let p = Point::new(50_000, -20_000);
        // Boundary is 20_000 away, budget is 10_000
        assert!(move_inside(&set, p, 10_000i128 * 10_000).is_none());
    }

    #[test]
    fn test_move_outside() {
        let set = square_set(0, 100_000);
        let p = Point::new(50_000, 10_000);
        let moved = move_outside(&set, p, 2_000, i128::MAX);
        assert!(!contains_point(&set, &moved));
        // Escaped through the bottom edge with the requested clearance
        assert!((moved.y - -2_000).abs() <= 10);
    }

    #[test]
    fn test_move_outside_budget_exceeded() {
        let set = square_set(0, 100_000);
        let p = Point::new(50_000, 50_000);
        // Centre is 50_000 from every edge; a 10_000 budget cannot escape
        let moved = move_outside(&set, p, 1_000, 10_000i128 * 10_000);
        assert_eq!(moved, p);
    }

    #[test]
    fn test_move_toward_clamps() {
        let p = Point::new(0, 0);
        let target = Point::new(100_000, 0);
        let moved = move_toward(p, target, &[], 30_000, 1_000);
        assert_eq!(moved, Point::new(30_000, 0));
    }

    #[test]
    fn test_move_toward_escapes_invalid() {
        let set = square_set(0, 100_000);
        let p = Point::new(50_000, -30_000);
        let target = Point::new(50_000, 5_000); // just inside the square
        let moved = move_toward(p, target, &set, 40_000, 2_000);
        assert!(!contains_point(&set, &moved));
        assert!(moved.distance(&p) <= 80_000.0);
    }
}
