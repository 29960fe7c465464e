//! FIFO Tracker Module
//!
//! Orders keys by insertion sequence for eviction. Reads never reorder keys.

use std::collections::BTreeMap;

// == FIFO Tracker ==
/// Tracks insertion order for FIFO eviction.
///
/// Keys are indexed by their insertion sequence, so the smallest sequence is
/// always the oldest insertion.
#[derive(Debug, Default)]
pub struct FifoTracker {
    order: BTreeMap<u64, String>,
}

impl FifoTracker {
    // == Constructor ==
    /// Creates a new empty tracker.
    pub fn new() -> Self {
        Self {
            order: BTreeMap::new(),
        }
    }

    // == Insert ==
    /// Records `key` at `sequence`.
    pub fn insert(&mut self, sequence: u64, key: &str) {
        self.order.insert(sequence, key.to_string());
    }

    // == Remove ==
    /// Forgets the key recorded at `sequence`.
    pub fn remove(&mut self, sequence: u64) {
        self.order.remove(&sequence);
    }

    // == Evict Oldest ==
    /// Returns and removes the oldest inserted key.
    ///
    /// Returns None if tracker is empty.
    pub fn evict_oldest(&mut self) -> Option<String> {
        self.order.pop_first().map(|(_, key)| key)
    }

    // == Peek Oldest ==
    /// Returns the oldest inserted key without removing it.
    #[cfg(test)]
    pub fn peek_oldest(&self) -> Option<&str> {
        self.order.values().next().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.order.clear();
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
