//! Keyed priority queue of edge-collapse candidates.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use nalgebra::{Matrix3, Point3, Vector3};

use super::quadric::Quadric;
use crate::mesh::Edge;

/// A candidate edge collapse.
///
/// Candidates order by `(phase, error, length, edge)` ascending, so the
/// queue minimum is the cheapest collapse of the lowest phase, with edge
/// identity as the final tiebreaker pinning iteration order.
#[derive(Debug, Clone)]
pub struct Collapse {
    /// The edge to collapse.
    pub edge: Edge,
    /// Sum of the endpoint quadrics at composition time.
    pub quadric: Quadric,
    /// Where the merged vertex lands.
    pub position: Point3<f32>,
    /// Quadric error of `position`.
    pub error: f32,
    /// Euclidean length of the edge at composition time.
    pub length: f32,
    /// Endpoint `a` is pinned (boundary vertex).
    pub fix_a: bool,
    /// Endpoint `b` is pinned (boundary vertex).
    pub fix_b: bool,
    /// Demotion tag; survives reinsertion so demoted candidates stay
    /// behind phase-zero ones.
    pub phase: i32,
}

impl Collapse {
    /// The position minimizing `q` for a collapse of `(a, b)`.
    ///
    /// A pinned endpoint wins outright. Otherwise the upper-left 3x3 block
    /// of the form is solved against its translation column when it is
    /// invertible; a near-singular block falls back to the edge midpoint.
    pub fn optimal_position(
        q: &Quadric,
        a: &Point3<f32>,
        b: &Point3<f32>,
        fix_a: bool,
        fix_b: bool,
    ) -> Point3<f32> {
        if fix_a {
            return *a;
        }
        if fix_b {
            return *b;
        }
        let block: Matrix3<f32> = q.q.fixed_view::<3, 3>(0, 0).into_owned();
        if block.determinant().abs() > 1.0e-6 {
            if let Some(inverse) = block.try_inverse() {
                let rhs = Vector3::new(-q.q[(0, 3)], -q.q[(1, 3)], -q.q[(2, 3)]);
                return Point3::from(inverse * rhs);
            }
        }
        nalgebra::center(a, b)
    }
}

impl PartialEq for Collapse {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Collapse {}

impl PartialOrd for Collapse {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Collapse {
    fn cmp(&self, other: &Self) -> Ordering {
        self.phase
            .cmp(&other.phase)
            .then_with(|| self.error.total_cmp(&other.error))
            .then_with(|| self.length.total_cmp(&other.length))
            .then_with(|| self.edge.cmp(&other.edge))
    }
}

/// Ordered collapse candidates with erase-by-edge.
///
/// An ordered set provides the minimum; a side table from edge to the
/// stored candidate makes removal by key possible without scanning. The
/// two structures always agree: every inserted candidate appears in both,
/// and at most one candidate per edge is live at a time.
#[derive(Debug, Default)]
pub struct CollapseQueue {
    ordered: BTreeSet<Collapse>,
    by_edge: HashMap<Edge, Collapse>,
}

impl CollapseQueue {
    /// Create a queue with side-table capacity for `expected` candidates.
    pub fn with_capacity(expected: usize) -> Self {
        Self {
            ordered: BTreeSet::new(),
            by_edge: HashMap::with_capacity(expected * 2 + 1),
        }
    }

    /// Insert a candidate. The caller must have erased any previous
    /// candidate for the same edge.
    pub fn insert(&mut self, collapse: Collapse) {
        debug_assert!(!self.by_edge.contains_key(&collapse.edge));
        self.by_edge.insert(collapse.edge, collapse.clone());
        self.ordered.insert(collapse);
    }

    /// Remove the candidate for `edge`, returning its phase, or `None`
    /// if the edge is not queued.
    pub fn erase(&mut self, edge: &Edge) -> Option<i32> {
        let collapse = self.by_edge.remove(edge)?;
        let removed = self.ordered.remove(&collapse);
        debug_assert!(removed);
        Some(collapse.phase)
    }

    /// The current minimum candidate, without removing it.
    pub fn peek(&self) -> Option<&Collapse> {
        self.ordered.first()
    }

    /// Number of live candidates.
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    /// True if no candidates are queued.
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(edge: Edge, error: f32, length: f32, phase: i32) -> Collapse {
        Collapse {
            edge,
            quadric: Quadric::zero(),
            position: Point3::origin(),
            error,
            length,
            fix_a: false,
            fix_b: false,
            phase,
        }
    }

    #[test]
    fn test_min_is_lowest_error() {
        let mut queue = CollapseQueue::with_capacity(4);
        queue.insert(candidate(Edge::new(0, 1), 3.0, 1.0, 0));
        queue.insert(candidate(Edge::new(1, 2), 0.5, 1.0, 0));
        queue.insert(candidate(Edge::new(2, 3), 2.0, 1.0, 0));
        assert_eq!(queue.peek().unwrap().edge, Edge::new(1, 2));
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_phase_dominates_error() {
        let mut queue = CollapseQueue::with_capacity(4);
        queue.insert(candidate(Edge::new(0, 1), 0.001, 1.0, 1));
        queue.insert(candidate(Edge::new(1, 2), 9.0, 1.0, 0));
        assert_eq!(queue.peek().unwrap().edge, Edge::new(1, 2));
    }

    #[test]
    fn test_length_then_edge_break_ties() {
        let mut queue = CollapseQueue::with_capacity(4);
        queue.insert(candidate(Edge::new(5, 6), 1.0, 2.0, 0));
        queue.insert(candidate(Edge::new(3, 4), 1.0, 1.0, 0));
        queue.insert(candidate(Edge::new(0, 9), 1.0, 1.0, 0));
        // Same error: shorter edge first, then smaller edge key.
        assert_eq!(queue.peek().unwrap().edge, Edge::new(0, 9));
        queue.erase(&Edge::new(0, 9));
        assert_eq!(queue.peek().unwrap().edge, Edge::new(3, 4));
    }

    #[test]
    fn test_erase_returns_phase() {
        let mut queue = CollapseQueue::with_capacity(4);
        queue.insert(candidate(Edge::new(0, 1), 1.0, 1.0, 2));
        assert_eq!(queue.erase(&Edge::new(0, 1)), Some(2));
        assert_eq!(queue.erase(&Edge::new(0, 1)), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_queue_is_monotonic_under_drain() {
        let mut queue = CollapseQueue::with_capacity(8);
        queue.insert(candidate(Edge::new(0, 1), 4.0, 1.0, 0));
        queue.insert(candidate(Edge::new(1, 2), 1.0, 1.0, 1));
        queue.insert(candidate(Edge::new(2, 3), 2.0, 2.0, 0));
        queue.insert(candidate(Edge::new(3, 4), 2.0, 1.0, 0));

        let mut drained = Vec::new();
        while let Some(best) = queue.peek().cloned() {
            queue.erase(&best.edge);
            drained.push(best);
        }
        for pair in drained.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
        assert_eq!(drained.len(), 4);
    }

    #[test]
    fn test_optimal_position_pinned_endpoint() {
        let q = Quadric::zero();
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(2.0, 0.0, 0.0);
        assert_eq!(Collapse::optimal_position(&q, &a, &b, true, false), a);
        assert_eq!(Collapse::optimal_position(&q, &a, &b, false, true), b);
        // Zero quadric is singular: midpoint fallback.
        assert_eq!(
            Collapse::optimal_position(&q, &a, &b, false, false),
            Point3::new(1.0, 0.0, 0.0)
        );
    }

    #[test]
    fn test_optimal_position_solves_plane_intersection() {
        // Three orthogonal planes through (1, 2, 3).
        let mut q = Quadric::zero();
        q.add_plane(&Vector3::new(1.0, 0.0, 0.0), -1.0);
        q.add_plane(&Vector3::new(0.0, 1.0, 0.0), -2.0);
        q.add_plane(&Vector3::new(0.0, 0.0, 1.0), -3.0);
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(10.0, 10.0, 10.0);
        let p = Collapse::optimal_position(&q, &a, &b, false, false);
        assert!((p - Point3::new(1.0, 2.0, 3.0)).norm() < 1.0e-5);
    }
}
