use std::cmp::Ordering;

use crate::NodeId;

#[derive(Copy, Clone, Debug)]
pub(super) struct State {
    pub(super) cost: f64,
    pub(super) gain: f64,
    pub(super) node: NodeId,
}

impl State {
    /// Lexicographic key: weight, then climb, then node id
    fn key_cmp(&self, other: &Self) -> Ordering {
        self.cost
            .total_cmp(&other.cost)
            .then_with(|| self.gain.total_cmp(&other.gain))
            .then_with(|| self.node.cmp(&other.node))
    }

    /// Whether this label beats `other` for the same node
    pub(super) fn improves(&self, other: &Self) -> bool {
        self.key_cmp(other) == Ordering::Less
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.key_cmp(other) == Ordering::Equal
    }
}

impl Eq for State {}

// Implement Ord for State to use in BinaryHeap
impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap (reversed from standard Rust BinaryHeap)
        other.key_cmp(self)
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
