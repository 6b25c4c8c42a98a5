//! Severity-indexed routing table
//!
//! Maps each severity bucket to the named sinks registered for it. The whole
//! table lives in one immutable snapshot behind an atomic pointer: readers
//! load the current snapshot without taking any lock, writers copy the
//! snapshot, apply their edit, and install the copy under a compare-and-swap
//! retry loop. A reader therefore never observes a bucket mid-mutation, and
//! registration churn never stalls producers.

use super::event::Event;
use super::level::{Severity, SEVERITY_COUNT};
use crate::sinks::Sink;
use arc_swap::ArcSwap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

type SinkMap = BTreeMap<String, Arc<dyn Sink>>;

/// Immutable point-in-time view of every severity bucket.
#[derive(Clone, Default)]
struct Snapshot {
    buckets: [SinkMap; SEVERITY_COUNT],
}

/// Dispatch counters, inspectable at runtime.
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    events_dispatched: AtomicU64,
    sink_errors: AtomicU64,
}

impl DispatchMetrics {
    pub const fn new() -> Self {
        Self {
            events_dispatched: AtomicU64::new(0),
            sink_errors: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn events_dispatched(&self) -> u64 {
        self.events_dispatched.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sink_errors(&self) -> u64 {
        self.sink_errors.load(Ordering::Relaxed)
    }

    #[inline]
    fn record_dispatched(&self) {
        self.events_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn record_sink_error(&self) {
        self.sink_errors.fetch_add(1, Ordering::Relaxed);
    }
}

/// Lock-free severity → sinks routing table.
pub struct RoutingTable {
    snapshot: ArcSwap<Snapshot>,
    metrics: Arc<DispatchMetrics>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(Snapshot::default()),
            metrics: Arc::new(DispatchMetrics::new()),
        }
    }

    /// Register or replace `sink` under `name` at every bucket from `level`
    /// up to `Severity::Error`.
    pub fn add_output(&self, name: impl Into<String>, level: Severity, sink: Arc<dyn Sink>) {
        let name = name.into();
        self.snapshot.rcu(|current| {
            let mut next = Snapshot::clone(current);
            // A replaced registration may have lived at a lower level; clear
            // it everywhere before inserting at the new one.
            for bucket in next.buckets.iter_mut() {
                bucket.remove(&name);
            }
            for idx in level.index()..SEVERITY_COUNT {
                next.buckets[idx].insert(name.clone(), Arc::clone(&sink));
            }
            next
        });
    }

    /// Remove `name` from every bucket it was registered in.
    pub fn del_output(&self, name: &str) {
        self.snapshot.rcu(|current| {
            let mut next = Snapshot::clone(current);
            for bucket in next.buckets.iter_mut() {
                bucket.remove(name);
            }
            next
        });
    }

    /// Reset every bucket to empty.
    pub fn clear(&self) {
        self.snapshot.store(Arc::new(Snapshot::default()));
    }

    /// Deliver `event` to every sink registered at its severity bucket,
    /// synchronously, in name order. Write failures are counted and reported
    /// on stderr; they never propagate to the producer.
    pub fn dispatch(&self, level: Severity, event: &Event) {
        let snapshot = self.snapshot.load();
        let bucket = &snapshot.buckets[level.index()];
        if bucket.is_empty() {
            return;
        }

        self.metrics.record_dispatched();
        for (name, sink) in bucket.iter() {
            if let Err(e) = sink.write(event) {
                self.metrics.record_sink_error();
                eprintln!("[FANLOG ERROR] sink '{}' failed: {}", name, e);
            }
        }
    }

    /// Whether any sink is registered at `level`'s bucket. Lets callers skip
    /// message rendering for unrouted severities.
    pub fn is_routed(&self, level: Severity) -> bool {
        !self.snapshot.load().buckets[level.index()].is_empty()
    }

    /// Every registered sink exactly once, in name order.
    pub fn outputs(&self) -> Vec<(String, Arc<dyn Sink>)> {
        let snapshot = self.snapshot.load();
        let mut unique: SinkMap = BTreeMap::new();
        for bucket in snapshot.buckets.iter() {
            for (name, sink) in bucket.iter() {
                unique.entry(name.clone()).or_insert_with(|| Arc::clone(sink));
            }
        }
        unique.into_iter().collect()
    }

    pub fn metrics(&self) -> &Arc<DispatchMetrics> {
        &self.metrics
    }
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self::new()
    }
}
