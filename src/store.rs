//! Bounded in-memory result store.
//!
//! Holds the most recent detections in insertion order and derives the views
//! the presentation layer reads: `featured`, `recent` and `all`. Eviction is
//! strict FIFO once the capacity is exceeded; confidence never protects an
//! entry.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::RwLock;
use serde::Serialize;

use crate::cable::CableType;
use crate::config::{
    DetectorConfig, DEFAULT_FEATURED_THRESHOLD, DEFAULT_RECENT_LIMIT, DEFAULT_STORE_CAPACITY,
};
use crate::detect::{ConfidenceBand, DetectionResult};

struct Entry {
    /// Insertion order; breaks ties between equal timestamps.
    seq: u64,
    result: Arc<DetectionResult>,
}

impl Entry {
    fn recency(&self) -> (SystemTime, u64) {
        (self.result.detected_at(), self.seq)
    }
}

#[derive(Default)]
struct StoreState {
    entries: VecDeque<Entry>,
    next_seq: u64,
}

/// Counts over the current contents.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StoreSummary {
    pub total: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub by_type: BTreeMap<CableType, usize>,
}

/// Single-owner result set.
///
/// Writers (`add`, `clear`) hold the write lock for the whole append and
/// eviction, so readers always see a complete set. Readers get `Arc`
/// snapshots that stay valid after eviction.
pub struct ResultStore {
    state: RwLock<StoreState>,
    capacity: usize,
    recent_limit: usize,
    featured_threshold: f32,
}

impl ResultStore {
    /// A zero capacity or recent limit is raised to one.
    pub fn new(capacity: usize, recent_limit: usize, featured_threshold: f32) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: RwLock::new(StoreState {
                entries: VecDeque::with_capacity(capacity + 1),
                next_seq: 0,
            }),
            capacity,
            recent_limit: recent_limit.max(1),
            featured_threshold,
        }
    }

    pub fn from_config(config: &DetectorConfig) -> Self {
        Self::new(
            config.store.capacity,
            config.store.recent_limit,
            config.store.featured_threshold,
        )
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn featured_threshold(&self) -> f32 {
        self.featured_threshold
    }

    /// Append a result, evicting the oldest entries beyond capacity.
    pub fn add(&self, result: DetectionResult) -> Arc<DetectionResult> {
        let result = Arc::new(result);
        let mut state = self.state.write();
        let seq = state.next_seq;
        state.next_seq += 1;
        state.entries.push_back(Entry {
            seq,
            result: Arc::clone(&result),
        });

        let mut evicted = 0;
        while state.entries.len() > self.capacity {
            state.entries.pop_front();
            evicted += 1;
        }
        if evicted > 0 {
            log::debug!("result store evicted {} oldest entries", evicted);
        }
        result
    }

    /// Most recent entry at or above the featured threshold.
    pub fn featured(&self) -> Option<Arc<DetectionResult>> {
        let state = self.state.read();
        state
            .entries
            .iter()
            .filter(|e| e.result.confidence() >= self.featured_threshold)
            .max_by_key(|e| e.recency())
            .map(|e| Arc::clone(&e.result))
    }

    /// Up to `limit` entries, most recent first.
    pub fn recent(&self, limit: usize) -> Vec<Arc<DetectionResult>> {
        let state = self.state.read();
        let mut entries: Vec<&Entry> = state.entries.iter().collect();
        entries.sort_by_key(|e| std::cmp::Reverse(e.recency()));
        entries
            .into_iter()
            .take(limit)
            .map(|e| Arc::clone(&e.result))
            .collect()
    }

    /// [`ResultStore::recent`] with the configured limit.
    pub fn recent_default(&self) -> Vec<Arc<DetectionResult>> {
        self.recent(self.recent_limit)
    }

    /// Every entry, oldest first.
    pub fn all(&self) -> Vec<Arc<DetectionResult>> {
        self.state
            .read()
            .entries
            .iter()
            .map(|e| Arc::clone(&e.result))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    pub fn clear(&self) {
        let mut state = self.state.write();
        let dropped = state.entries.len();
        state.entries.clear();
        log::debug!("result store cleared ({} entries)", dropped);
    }

    pub fn summary(&self) -> StoreSummary {
        let state = self.state.read();
        let mut summary = StoreSummary {
            total: state.entries.len(),
            ..StoreSummary::default()
        };
        for entry in &state.entries {
            match entry.result.band() {
                ConfidenceBand::High => summary.high += 1,
                ConfidenceBand::Medium => summary.medium += 1,
                ConfidenceBand::Low => summary.low += 1,
            }
            *summary
                .by_type
                .entry(entry.result.detected_type())
                .or_insert(0) += 1;
        }
        summary
    }
}

impl Default for ResultStore {
    fn default() -> Self {
        Self::new(
            DEFAULT_STORE_CAPACITY,
            DEFAULT_RECENT_LIMIT,
            DEFAULT_FEATURED_THRESHOLD,
        )
    }
}
