//! Memoized analytics results keyed on the workspace version.
//!
//! Every workspace mutation bumps its version; a lookup with a version other
//! than the one the cache was filled at drops every entry first.

use crate::analytics::cooccurrence::{CooccurrenceMatrix, ProximityOptions};
use crate::analytics::frequency::CodeFrequency;
use crate::analytics::heatmap::Heatmap;
use log::trace;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Cache key of one analytics view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalyticsKey {
    Frequencies,
    DocumentCooccurrence { top_n: usize },
    SegmentCooccurrence { top_n: usize, options: ProximityOptions },
    Heatmap { code_limit: usize, document_limit: usize },
}

/// Cached value of one analytics view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyticsValue {
    Frequencies(Vec<CodeFrequency>),
    Cooccurrence(CooccurrenceMatrix),
    Heatmap(Heatmap),
}

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    version: Option<u64>,
    entries: HashMap<AnalyticsKey, AnalyticsValue>,
    stats: CacheStats,
}

/// Thread-safe memo table. Shared readers may fill it concurrently.
#[derive(Debug, Default)]
pub struct AnalyticsCache {
    state: Mutex<CacheState>,
}

impl AnalyticsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value for `key` at `version`, computing and storing
    /// it on a miss.
    ///
    /// `compute` runs outside the lock.
    pub fn get_or_compute<F>(&self, version: u64, key: AnalyticsKey, compute: F) -> AnalyticsValue
    where
        F: FnOnce() -> AnalyticsValue,
    {
        {
            let mut state = self.state.lock();
            if state.version != Some(version) {
                state.entries.clear();
                state.version = Some(version);
            }
            if let Some(value) = state.entries.get(&key).cloned() {
                state.stats.hits += 1;
                return value;
            }
            state.stats.misses += 1;
        }

        trace!(
            "event=analytics_compute module=analytics status=miss version={} key={:?}",
            version,
            key
        );
        let value = compute();
        let mut state = self.state.lock();
        if state.version == Some(version) {
            state.entries.insert(key, value.clone());
        }
        value
    }

    /// Drops every entry. Counters are kept.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.version = None;
    }

    pub fn stats(&self) -> CacheStats {
        self.state.lock().stats
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
