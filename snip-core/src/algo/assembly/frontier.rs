use std::{cmp::Ordering, collections::BinaryHeap};

use hashbrown::{HashMap, hash_map::Entry};

use crate::{NodeId, routing::SolvedPath};

#[derive(Copy, Clone, Debug)]
struct Pending {
    cost: f64,
    node: NodeId,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Pending {}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap by cost, then by node id
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Cheapest known connection of every unassigned inlet to the forest
#[derive(Debug, Default)]
pub(super) struct Frontier {
    heap: BinaryHeap<Pending>,
    candidates: HashMap<NodeId, SolvedPath>,
}

impl Frontier {
    /// Records `path` for `node` unless a cheaper or equal one is known
    pub(super) fn offer(&mut self, node: NodeId, path: SolvedPath) -> bool {
        let pending = Pending {
            cost: path.cost,
            node,
        };
        match self.candidates.entry(node) {
            Entry::Vacant(entry) => {
                entry.insert(path);
            }
            Entry::Occupied(mut entry) => {
                if path.cost >= entry.get().cost {
                    return false;
                }
                entry.insert(path);
            }
        }
        self.heap.push(pending);
        true
    }

    /// Removes and returns the globally cheapest connection
    pub(super) fn pop(&mut self) -> Option<(NodeId, SolvedPath)> {
        while let Some(pending) = self.heap.pop() {
            let current = self
                .candidates
                .get(&pending.node)
                .is_some_and(|path| path.cost.to_bits() == pending.cost.to_bits());
            if current {
                return self
                    .candidates
                    .remove(&pending.node)
                    .map(|path| (pending.node, path));
            }
        }
        None
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.candidates.len()
    }
}
