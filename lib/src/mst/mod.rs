//! Euclidean minimum spanning trees over contact-node positions.
//!
//! The drop loop only ever asks "which nodes is this node connected to" —
//! edge weights are never read back — so the tree is stored purely as an
//! adjacency map. Point sets are small per layer; the O(n²) Prim
//! construction is deliberate.

use crate::geometry::Point;
use std::collections::HashMap;

/// A Euclidean MST over a set of 2D points, exposing neighbour lookups.
///
/// Equal-length edges are resolved by lexicographic coordinate order, so
/// identical inputs always build the identical tree.
#[derive(Debug, Clone)]
pub struct MinimumSpanningTree {
    adjacency: HashMap<Point, Vec<Point>>,
}

impl MinimumSpanningTree {
    pub fn new(points: impl IntoIterator<Item = Point>) -> Self {
        let mut pts: Vec<Point> = points.into_iter().collect();
        pts.sort_unstable();
        pts.dedup();

        let mut adjacency: HashMap<Point, Vec<Point>> = HashMap::with_capacity(pts.len());
        if pts.is_empty() {
            return Self { adjacency };
        }
        for &p in &pts {
            adjacency.insert(p, Vec::new());
        }
        if pts.len() == 1 {
            return Self { adjacency };
        }

        let n = pts.len();
        let mut in_tree = vec![false; n];
        let mut best_dist = vec![i128::MAX; n];
        let mut best_parent = vec![0usize; n];

        // Grow from the lexicographically smallest point.
        in_tree[0] = true;
        for i in 1..n {
            best_dist[i] = pts[0].distance_squared(&pts[i]);
        }

        for _ in 1..n {
            // Scanning in sorted order with a strict comparison breaks
            // distance ties toward the smaller point.
            let mut next = usize::MAX;
            let mut next_dist = i128::MAX;
            for i in 0..n {
                if !in_tree[i] && best_dist[i] < next_dist {
                    next_dist = best_dist[i];
                    next = i;
                }
            }

            in_tree[next] = true;
            let parent = best_parent[next];
            adjacency.get_mut(&pts[parent]).unwrap().push(pts[next]);
            adjacency.get_mut(&pts[next]).unwrap().push(pts[parent]);

            for i in 0..n {
                if !in_tree[i] {
                    let d = pts[next].distance_squared(&pts[i]);
                    if d < best_dist[i] {
                        best_dist[i] = d;
                        best_parent[i] = next;
                    }
                }
            }
        }

        for neighbours in adjacency.values_mut() {
            neighbours.sort_unstable();
        }

        Self { adjacency }
    }

    /// Neighbours of `p` in the tree. Empty for unknown points.
    pub fn adjacent(&self, p: &Point) -> &[Point] {
        self.adjacency.get(p).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_singleton() {
        let empty = MinimumSpanningTree::new([]);
        assert!(empty.is_empty());
        assert!(empty.adjacent(&Point::zero()).is_empty());

        let single = MinimumSpanningTree::new([Point::new(5, 5)]);
        assert_eq!(single.len(), 1);
        assert!(single.adjacent(&Point::new(5, 5)).is_empty());
    }

    #[test]
    fn test_chain() {
        // Three collinear points: the middle one bridges the ends.
        let a = Point::new(0, 0);
        let b = Point::new(10, 0);
        let c = Point::new(25, 0);
        let mst = MinimumSpanningTree::new([a, b, c]);

        assert_eq!(mst.adjacent(&a), &[b]);
        assert_eq!(mst.adjacent(&b), &[a, c]);
        assert_eq!(mst.adjacent(&c), &[b]);
    }

    #[test]
    fn test_edges_are_symmetric() {
        let points = [
            Point::new(0, 0),
            Point::new(100, 30),
            Point::new(40, 80),
            Point::new(-50, 60),
            Point::new(20, -70),
        ];
        let mst = MinimumSpanningTree::new(points);

        let mut edge_count = 0;
        for p in &points {
            for q in mst.adjacent(p) {
                assert!(mst.adjacent(q).contains(p));
                edge_count += 1;
            }
        }
        // A tree on 5 vertices has 4 edges, each seen twice.
        assert_eq!(edge_count, 8);
    }

    #[test]
    fn test_duplicate_points_collapse() {
        let mst = MinimumSpanningTree::new([Point::new(0, 0), Point::new(0, 0), Point::new(9, 0)]);
        assert_eq!(mst.len(), 2);
    }

    #[test]
    fn test_deterministic_under_ties() {
        // Four corners of a square admit several MSTs; tie-breaking must
        // pick the same one every time.
        let square = [
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(0, 10),
            Point::new(10, 10),
        ];
        let first = MinimumSpanningTree::new(square);
        for _ in 0..10 {
            let again = MinimumSpanningTree::new(square);
            for p in &square {
                assert_eq!(first.adjacent(p), again.adjacent(p));
            }
        }
    }
}
