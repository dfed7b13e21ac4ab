//! Axis-aligned bounding boxes.

use super::Point;
use crate::Coord;
use serde::{Deserialize, Serialize};

/// An axis-aligned 2D bounding box in scaled integer coordinates.
///
/// A default-constructed box is empty (min > max) and absorbs the first
/// merged point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point,
    pub max: Point,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::new()
    }
}

impl BoundingBox {
    pub fn new() -> Self {
        Self {
            min: Point::new(Coord::MAX, Coord::MAX),
            max: Point::new(Coord::MIN, Coord::MIN),
        }
    }

    pub fn from_points_minmax(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    pub fn from_points(points: &[Point]) -> Self {
        let mut bb = Self::new();
        for p in points {
            bb.merge_point(*p);
        }
        bb
    }

    #[inline]
    pub fn is_defined(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y
    }

    pub fn merge_point(&mut self, p: Point) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    #[inline]
    pub fn width(&self) -> Coord {
        if self.is_defined() {
            self.max.x - self.min.x
        } else {
            0
        }
    }

    #[inline]
    pub fn height(&self) -> Coord {
        if self.is_defined() {
            self.max.y - self.min.y
        } else {
            0
        }
    }

    #[inline]
    pub fn center(&self) -> Point {
        Point::new((self.min.x + self.max.x) / 2, (self.min.y + self.max.y) / 2)
    }

    #[inline]
    pub fn contains_point(&self, p: &Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn expand(&mut self, margin: Coord) {
        if self.is_defined() {
            self.min.x -= margin;
            self.min.y -= margin;
            self.max.x += margin;
            self.max.y += margin;
        }
    }

    pub fn expanded(&self, margin: Coord) -> Self {
        let mut result = *self;
        result.expand(margin);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_points() {
        let bb = BoundingBox::from_points(&[
            Point::new(10, 50),
            Point::new(-20, 5),
            Point::new(30, 0),
        ]);
        assert_eq!(bb.min, Point::new(-20, 0));
        assert_eq!(bb.max, Point::new(30, 50));
        assert_eq!(bb.width(), 50);
        assert_eq!(bb.height(), 50);
    }

    #[test]
    fn test_empty_box() {
        let bb = BoundingBox::new();
        assert!(!bb.is_defined());
        assert_eq!(bb.width(), 0);
    }

    #[test]
    fn test_center_and_contains() {
        let bb = BoundingBox::from_points_minmax(Point::new(0, 0), Point::new(100, 50));
        assert_eq!(bb.center(), Point::new(50, 25));
        assert!(bb.contains_point(&Point::new(100, 50)));
        assert!(!bb.contains_point(&Point::new(101, 50)));
    }

    #[test]
    fn test_expand() {
        let bb = BoundingBox::from_points_minmax(Point::new(0, 0), Point::new(10, 10));
        let grown = bb.expanded(5);
        assert_eq!(grown.min, Point::new(-5, -5));
        assert_eq!(grown.max, Point::new(15, 15));
    }
}
