//! Closed polygon contours.

use super::{BoundingBox, Point};
use crate::{Coord, CoordF};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A closed polygon defined by a sequence of points.
///
/// The polygon is implicitly closed: the last point connects back to the
/// first. Counter-clockwise order means positive area (exterior contour);
/// clockwise means negative area (hole).
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Polygon {
    points: Vec<Point>,
}

impl Polygon {
    #[inline]
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    #[inline]
    pub fn from_points(points: Vec<Point>) -> Self {
        Self { points }
    }

    #[inline]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    pub fn push(&mut self, point: Point) {
        self.points.push(point);
    }

    /// Signed area by the shoelace formula. Positive for counter-clockwise.
    pub fn signed_area(&self) -> CoordF {
        if self.points.len() < 3 {
            return 0.0;
        }

        let mut sum: i128 = 0;
        for i in 0..self.points.len() {
            let j = (i + 1) % self.points.len();
            sum += self.points[i].x as i128 * self.points[j].y as i128;
            sum -= self.points[j].x as i128 * self.points[i].y as i128;
        }

        sum as CoordF / 2.0
    }

    #[inline]
    pub fn area(&self) -> CoordF {
        self.signed_area().abs()
    }

    #[inline]
    pub fn is_counter_clockwise(&self) -> bool {
        self.signed_area() > 0.0
    }

    pub fn reverse(&mut self) {
        self.points.reverse();
    }

    /// Point-in-polygon by ray casting. Boundary points may fall on either
    /// side; callers that care use a tolerance query instead.
    pub fn contains_point(&self, p: &Point) -> bool {
        if self.points.len() < 3 {
            return false;
        }

        let mut inside = false;
        let mut j = self.points.len() - 1;

        for i in 0..self.points.len() {
            let pi = &self.points[i];
            let pj = &self.points[j];

            if ((pi.y > p.y) != (pj.y > p.y))
                && (p.x as i128)
                    < (pj.x as i128 - pi.x as i128) * (p.y as i128 - pi.y as i128)
                        / (pj.y as i128 - pi.y as i128)
                        + pi.x as i128
            {
                inside = !inside;
            }
            j = i;
        }

        inside
    }

    /// Closest point on the polygon boundary to `p`.
    pub fn closest_point(&self, p: &Point) -> Point {
        if self.points.is_empty() {
            return Point::zero();
        }
        if self.points.len() == 1 {
            return self.points[0];
        }

        let mut closest = self.points[0];
        let mut min_dist = i128::MAX;

        for i in 0..self.points.len() {
            let a = self.points[i];
            let b = self.points[(i + 1) % self.points.len()];
            let proj = p.project_onto_segment(a, b);
            let dist = p.distance_squared(&proj);
            if dist < min_dist {
                min_dist = dist;
                closest = proj;
            }
        }

        closest
    }

    /// Centroid (centre of mass). Degenerate polygons fall back to the
    /// vertex average.
    pub fn centroid(&self) -> Point {
        if self.points.is_empty() {
            return Point::zero();
        }

        let mut cx: i128 = 0;
        let mut cy: i128 = 0;
        let mut area: i128 = 0;

        for i in 0..self.points.len() {
            let j = (i + 1) % self.points.len();
            let cross = self.points[i].x as i128 * self.points[j].y as i128
                - self.points[j].x as i128 * self.points[i].y as i128;
            cx += (self.points[i].x as i128 + self.points[j].x as i128) * cross;
            cy += (self.points[i].y as i128 + self.points[j].y as i128) * cross;
            area += cross;
        }

        if area == 0 {
            let sum_x: i128 = self.points.iter().map(|p| p.x as i128).sum();
            let sum_y: i128 = self.points.iter().map(|p| p.y as i128).sum();
            return Point::new(
                (sum_x / self.points.len() as i128) as Coord,
                (sum_y / self.points.len() as i128) as Coord,
            );
        }

        Point::new((cx / (3 * area)) as Coord, (cy / (3 * area)) as Coord)
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(&self.points)
    }

    pub fn translate(&mut self, v: Point) {
        for p in &mut self.points {
            *p = *p + v;
        }
    }

    pub fn translated(&self, v: Point) -> Self {
        let mut result = self.clone();
        result.translate(v);
        result
    }

    /// Rotate about the origin.
    pub fn rotate(&mut self, angle: CoordF) {
        for p in &mut self.points {
            *p = p.rotate(angle);
        }
    }

    /// Drop vertices whose removal keeps the contour within `max_deviation`
    /// and only removes edges shorter than `min_segment`. Returns an empty
    /// polygon if fewer than three vertices survive.
    pub fn simplified(&self, min_segment: Coord, max_deviation: Coord) -> Polygon {
        if self.points.len() < 3 {
            return self.clone();
        }

        let min_seg2 = (min_segment as i128) * (min_segment as i128);
        let max_dev2 = (max_deviation as i128) * (max_deviation as i128);
        let n = self.points.len();

        let mut kept: Vec<Point> = Vec::with_capacity(n);
        for i in 0..n {
            let prev = *kept.last().unwrap_or(&self.points[n - 1]);
            let curr = self.points[i];
            let next = self.points[(i + 1) % n];

            let short = curr.distance_squared(&prev) < min_seg2
                || curr.distance_squared(&next) < min_seg2;
            if short {
                let proj = curr.project_onto_segment(prev, next);
                if curr.distance_squared(&proj) < max_dev2 {
                    continue;
                }
            }
            kept.push(curr);
        }

        if kept.len() < 3 {
            return Polygon::new();
        }
        Polygon::from_points(kept)
    }

    /// Remove micrometre slivers: segments shorter than `shortest` whose
    /// removal deviates by less than `shortest`.
    #[inline]
    pub fn smoothed(&self, shortest: Coord) -> Polygon {
        self.simplified(shortest, shortest)
    }

    /// Axis-aligned rectangle from two opposite corners, counter-clockwise.
    pub fn rectangle(min: Point, max: Point) -> Self {
        Self::from_points(vec![
            min,
            Point::new(max.x, min.y),
            max,
            Point::new(min.x, max.y),
        ])
    }

    /// Circle approximation with `segments` vertices.
    pub fn circle(center: Point, radius: Coord, segments: usize) -> Self {
        let mut points = Vec::with_capacity(segments);
        for i in 0..segments {
            let angle = 2.0 * std::f64::consts::PI * i as CoordF / segments as CoordF;
            points.push(Point::new(
                center.x + (radius as CoordF * angle.cos()).round() as Coord,
                center.y + (radius as CoordF * angle.sin()).round() as Coord,
            ));
        }
        Self::from_points(points)
    }
}

impl fmt::Debug for Polygon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Polygon({} points)", self.points.len())
    }
}

impl From<Vec<Point>> for Polygon {
    fn from(points: Vec<Point>) -> Self {
        Self::from_points(points)
    }
}
