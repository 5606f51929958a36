//! Index-modulo work partitioning for full parallel runs.
//!
//! File `i` of an ordered file set goes to worker `i mod n`. The split needs
//! no coordination and is stable for a given file order. It may be
//! imbalanced, which only matters for the one-time cold run.

use serde::{Deserialize, Serialize};

/// One worker's share of a partitioned file set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    /// Zero-based worker index.
    pub index: usize,
    /// Total number of workers.
    pub count: usize,
}

impl Partition {
    /// Creates a partition selector. A `count` of zero is treated as one.
    pub fn new(index: usize, count: usize) -> Self {
        Self {
            index,
            count: count.max(1),
        }
    }

    /// Returns `true` if the item at `position` belongs to this partition.
    pub fn contains(&self, position: usize) -> bool {
        position % self.count.max(1) == self.index
    }

    /// Keeps only the items of `items` that belong to this partition.
    pub fn select<T: Clone>(&self, items: &[T]) -> Vec<T> {
        items
            .iter()
            .enumerate()
            .filter(|(i, _)| self.contains(*i))
            .map(|(_, item)| item.clone())
            .collect()
    }
}

/// Splits `items` into `count` disjoint subsets by index modulo `count`.
pub fn partition<T: Clone>(items: &[T], count: usize) -> Vec<Vec<T>> {
    let count = count.max(1);
    let mut parts = vec![Vec::new(); count];
    for (i, item) in items.iter().enumerate() {
        parts[i % count].push(item.clone());
    }
    parts
}
