//! Bounded message-id cache for exactly-once application of broadcasts.
//!
//! Both transports carry the same id for one logical send, so the first
//! arrival is processed and the second is dropped here, whichever adapter it
//! came through.

use std::collections::{HashSet, VecDeque};

use tabmesh_proto::MessageId;

/// Default size that triggers a trim.
pub const DEFAULT_HIGH_WATER: usize = 200;

/// Default size kept after a trim.
pub const DEFAULT_LOW_WATER: usize = 100;

/// Recently-seen message ids.
///
/// Grows until it holds more than `high_water` ids, then drops the oldest
/// until `low_water` remain. An id evicted this way would be processed again,
/// which is harmless once it is old enough that no transport still carries it.
#[derive(Debug)]
pub struct MessageDeduplicator {
    seen: HashSet<MessageId>,
    /// Insertion order, oldest first.
    order: VecDeque<MessageId>,
    high_water: usize,
    low_water: usize,
}

impl MessageDeduplicator {
    pub fn new(high_water: usize, low_water: usize) -> Self {
        let high_water = high_water.max(1);
        let low_water = low_water.min(high_water);
        Self {
            seen: HashSet::with_capacity(high_water + 1),
            order: VecDeque::with_capacity(high_water + 1),
            high_water,
            low_water,
        }
    }

    /// Returns `true` the first time `id` is offered and records it.
    pub fn should_process(&mut self, id: &MessageId) -> bool {
        if self.seen.contains(id) {
            return false;
        }
        self.seen.insert(id.clone());
        self.order.push_back(id.clone());

        if self.seen.len() > self.high_water {
            self.trim();
        }
        true
    }

    fn trim(&mut self) {
        while self.order.len() > self.low_water {
            if let Some(old) = self.order.pop_front() {
                self.seen.remove(&old);
            }
        }
        tracing::trace!(kept = self.order.len(), "[dedup] Trimmed seen-id cache");
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl Default for MessageDeduplicator {
    fn default() -> Self {
        Self::new(DEFAULT_HIGH_WATER, DEFAULT_LOW_WATER)
    }
}
