//! Request-scoped diagnostic capture
//!
//! This module provides:
//! - `TraceRing`: fixed-capacity ring of the most recent events plus tags
//! - `RequestContext`: explicit per-request handle carrying the ring and a
//!   correlation id
//!
//! The ring is independent of the routing pipeline. Middleware creates a
//! `RequestContext` at the edge, threads it through application calls, and
//! diagnostic code reads the captured events back after the fact. A
//! `CaptureSink` registered like any other sink is what feeds events in.

use super::event::Event;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

struct RingState {
    events: VecDeque<Event>,
    tags: HashMap<String, String>,
}

/// Fixed-capacity ring of recent events with a small key/value tag map.
///
/// Insertion past capacity evicts the oldest entry. All access goes through
/// one ring-local lock; the ring is shared via `Arc` inside a
/// [`RequestContext`].
pub struct TraceRing {
    capacity: usize,
    state: Mutex<RingState>,
}

impl TraceRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(RingState {
                events: VecDeque::with_capacity(capacity),
                tags: HashMap::new(),
            }),
        }
    }

    /// Append an event, evicting the oldest entry if the ring is full.
    pub fn record(&self, event: Event) {
        let mut state = self.state.lock();
        if state.events.len() == self.capacity {
            state.events.pop_front();
        }
        state.events.push_back(event);
    }

    pub fn set_tag(&self, key: impl Into<String>, value: impl Into<String>) {
        self.state.lock().tags.insert(key.into(), value.into());
    }

    pub fn get_tag(&self, key: &str) -> Option<String> {
        self.state.lock().tags.get(key).cloned()
    }

    /// Visit events oldest to newest. The visitor returns `false` to stop
    /// early.
    pub fn for_each(&self, mut visit: impl FnMut(&Event) -> bool) {
        let state = self.state.lock();
        for event in &state.events {
            if !visit(event) {
                break;
            }
        }
    }

    /// Empty the ring and clear all tags.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.events.clear();
        state.tags.clear();
    }

    pub fn len(&self) -> usize {
        self.state.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Clone out the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<Event> {
        self.state.lock().events.iter().cloned().collect()
    }
}

/// Explicit per-request handle.
///
/// Cloning is cheap (two `Arc` bumps); every clone refers to the same ring,
/// so code deep in a call chain can record and tag without a plumbed-through
/// reference to the middleware layer. The correlation id is the request's
/// identity and survives [`TraceRing::reset`].
#[derive(Clone)]
pub struct RequestContext {
    correlation_id: Arc<str>,
    trace: Arc<TraceRing>,
}

impl RequestContext {
    pub fn new(correlation_id: impl Into<String>, capacity: usize) -> Self {
        Self {
            correlation_id: correlation_id.into().into(),
            trace: Arc::new(TraceRing::new(capacity)),
        }
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn trace(&self) -> &TraceRing {
        &self.trace
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("correlation_id", &self.correlation_id)
            .field("captured", &self.trace.len())
            .finish()
    }
}
