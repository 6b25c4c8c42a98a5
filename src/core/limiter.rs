//! Sliding-window admission control
//!
//! Approximate rate limiting over time-bucketed counters. Timestamps are
//! truncated to a configured granularity; each bucket expires after a
//! retention window and its count is subtracted from the running total on
//! eviction. Precision is bounded by the granularity, memory by
//! `ttl / granularity` live buckets.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::time::Duration;

struct Window {
    buckets: BTreeMap<i64, u64>,
    total: u64,
}

/// Sliding time-window event counter with a hard admission ceiling.
pub struct WindowLimiter {
    granularity_secs: i64,
    ttl_secs: i64,
    ceiling: u64,
    window: Mutex<Window>,
}

impl WindowLimiter {
    /// `granularity` is the bucket width, `ttl` how long a bucket stays
    /// live, `ceiling` the number of events admitted per live window.
    ///
    /// Sub-second durations are clamped up to one second; bucket keys are
    /// truncated Unix seconds.
    pub fn new(granularity: Duration, ttl: Duration, ceiling: u64) -> Self {
        Self {
            granularity_secs: (granularity.as_secs() as i64).max(1),
            ttl_secs: (ttl.as_secs() as i64).max(1),
            ceiling,
            window: Mutex::new(Window {
                buckets: BTreeMap::new(),
                total: 0,
            }),
        }
    }

    fn truncate(&self, at: DateTime<Utc>) -> i64 {
        let secs = at.timestamp();
        secs - secs.rem_euclid(self.granularity_secs)
    }

    /// Record one event at `at` and decide admission.
    ///
    /// The bucket and running total are incremented unconditionally; the
    /// decision compares the pre-increment total against the ceiling, so
    /// exactly `ceiling` events pass per live window.
    pub fn admit(&self, at: DateTime<Utc>) -> bool {
        let key = self.truncate(at);
        let cutoff = key - self.ttl_secs;

        let mut window = self.window.lock();

        // Evict expired buckets, giving their counts back to the total.
        let live = window.buckets.split_off(&(cutoff + 1));
        for (_, count) in std::mem::replace(&mut window.buckets, live) {
            window.total -= count;
        }

        let before = window.total;
        *window.buckets.entry(key).or_insert(0) += 1;
        window.total += 1;

        before < self.ceiling
    }

    /// Sum of live bucket counts.
    pub fn current_total(&self) -> u64 {
        self.window.lock().total
    }

    /// Number of live buckets.
    pub fn bucket_count(&self) -> usize {
        self.window.lock().buckets.len()
    }

    pub fn ceiling(&self) -> u64 {
        self.ceiling
    }
}
