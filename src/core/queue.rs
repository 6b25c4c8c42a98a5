//! Bounded event queue decoupling producers from slow sinks
//!
//! Producers never block: a full or closed queue rejects the push and the
//! rejection is counted. Consumer workers drain in bulk — block for the
//! first item, then take whatever else is immediately ready up to the batch
//! limit. Closing the queue wakes every blocked worker; once the backlog is
//! drained workers observe `still_open = false` and exit.

use super::event::Event;
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Liveness counters for one queue.
///
/// `rate_limited` counts events rejected by admission control, separately
/// from `write_errors` (actual delivery failures).
#[derive(Debug, Default)]
pub struct QueueStats {
    enqueued: AtomicU64,
    dequeued: AtomicU64,
    rejected: AtomicU64,
    write_errors: AtomicU64,
    rate_limited: AtomicU64,
}

impl QueueStats {
    pub const fn new() -> Self {
        Self {
            enqueued: AtomicU64::new(0),
            dequeued: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
            rate_limited: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dequeued(&self) -> u64 {
        self.dequeued.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn write_errors(&self) -> u64 {
        self.write_errors.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn rate_limited(&self) -> u64 {
        self.rate_limited.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_dequeued(&self, count: u64) {
        self.dequeued.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_write_errors(&self, count: u64) {
        self.write_errors.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_rate_limited(&self, count: u64) {
        self.rate_limited.fetch_add(count, Ordering::Relaxed);
    }
}

/// Bounded multi-producer/multi-consumer event queue.
pub struct EventQueue {
    sender: Mutex<Option<Sender<Event>>>,
    receiver: Receiver<Event>,
    capacity: usize,
    stats: Arc<QueueStats>,
}

impl EventQueue {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender: Mutex::new(Some(sender)),
            receiver,
            capacity,
            stats: Arc::new(QueueStats::new()),
        }
    }

    /// Non-blocking push. Returns `false` when the queue is full or closed;
    /// the rejection is counted either way.
    pub fn push_back(&self, event: Event) -> bool {
        let guard = self.sender.lock();
        let Some(sender) = guard.as_ref() else {
            self.stats.record_rejected();
            return false;
        };
        match sender.try_send(event) {
            Ok(()) => {
                self.stats.record_enqueued();
                true
            }
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.stats.record_rejected();
                false
            }
        }
    }

    /// Remove up to `max` ready events. Blocks until at least one event is
    /// available or the queue is closed. Returns `(events, still_open)`;
    /// `still_open` is `false` only once the queue is closed and empty.
    pub fn pop_front_bulk(&self, max: usize) -> (Vec<Event>, bool) {
        debug_assert!(max > 0);
        let first = match self.receiver.recv() {
            Ok(event) => event,
            Err(_) => return (Vec::new(), false),
        };

        let mut batch = Vec::with_capacity(max.min(self.capacity));
        batch.push(first);
        while batch.len() < max {
            match self.receiver.try_recv() {
                Ok(event) => batch.push(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        self.stats.record_dequeued(batch.len() as u64);
        (batch, true)
    }

    /// Close intake. Blocked consumers wake once the backlog drains; pushes
    /// after close always return `false`.
    pub fn close(&self) {
        self.sender.lock().take();
    }

    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Shared counter block. Sinks hand this to their workers so write
    /// failures land in the same statistics the producers see.
    pub fn stats(&self) -> &Arc<QueueStats> {
        &self.stats
    }
}

/// Join-tracked consumer threads for one sink.
///
/// `join` consumes the handles, so a sink's `close` can guarantee no worker
/// is still writing when it returns.
pub struct WorkerPool {
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    pub fn new() -> Self {
        Self {
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Spawn `count` workers running `work`.
    pub fn spawn<F>(&self, count: usize, work: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let work = Arc::new(work);
        let mut handles = self.handles.lock();
        for _ in 0..count {
            let work = Arc::clone(&work);
            handles.push(thread::spawn(move || work()));
        }
    }

    /// Wait for every worker to finish. Idempotent; a panicked worker is
    /// reported on stderr rather than propagated.
    pub fn join(&self) {
        let handles = std::mem::take(&mut *self.handles.lock());
        for handle in handles {
            if handle.join().is_err() {
                eprintln!("[FANLOG ERROR] sink worker panicked during shutdown");
            }
        }
    }

    pub fn worker_count(&self) -> usize {
        self.handles.lock().len()
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::level::Severity;
    use std::time::Duration;

    fn event(n: usize) -> Event {
        Event::new(Severity::Info, format!("event {}", n))
    }

    #[test]
    fn test_capacity_rejection() {
        let queue = EventQueue::new(4);
        let mut accepted = 0;
        for n in 0..10 {
            if queue.push_back(event(n)) {
                accepted += 1;
            }
        }

        assert_eq!(accepted, 4);
        assert_eq!(queue.stats().enqueued(), 4);
        assert_eq!(queue.stats().rejected(), 6);
    }

    #[test]
    fn test_bulk_pop_drains_ready_items() {
        let queue = EventQueue::new(16);
        for n in 0..5 {
            assert!(queue.push_back(event(n)));
        }

        let (batch, open) = queue.pop_front_bulk(3);
        assert!(open);
        assert_eq!(batch.len(), 3);
        assert_eq!(batch[0].message, "event 0");

        let (batch, open) = queue.pop_front_bulk(10);
        assert!(open);
        assert_eq!(batch.len(), 2);
        assert_eq!(queue.stats().dequeued(), 5);
    }

    #[test]
    fn test_push_after_close_rejected() {
        let queue = EventQueue::new(4);
        queue.close();
        assert!(!queue.push_back(event(0)));
        assert!(queue.is_closed());
    }

    #[test]
    fn test_pop_reports_closed_after_drain() {
        let queue = EventQueue::new(4);
        assert!(queue.push_back(event(0)));
        queue.close();

        let (batch, open) = queue.pop_front_bulk(8);
        assert!(open);
        assert_eq!(batch.len(), 1);

        let (batch, open) = queue.pop_front_bulk(8);
        assert!(!open);
        assert!(batch.is_empty());
    }

    #[test]
    fn test_close_wakes_blocked_worker() {
        let queue = Arc::new(EventQueue::new(4));
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop_front_bulk(8))
        };

        thread::sleep(Duration::from_millis(50));
        queue.close();

        let (batch, open) = consumer.join().expect("consumer");
        assert!(batch.is_empty());
        assert!(!open);
    }

    #[test]
    fn test_worker_pool_join() {
        let queue = Arc::new(EventQueue::new(64));
        let drained = Arc::new(AtomicU64::new(0));
        let pool = WorkerPool::new();

        {
            let queue = Arc::clone(&queue);
            let drained = Arc::clone(&drained);
            pool.spawn(3, move || loop {
                let (batch, open) = queue.pop_front_bulk(8);
                drained.fetch_add(batch.len() as u64, Ordering::Relaxed);
                if !open {
                    break;
                }
            });
        }

        for n in 0..40 {
            assert!(queue.push_back(event(n)));
        }
        queue.close();
        pool.join();

        assert_eq!(drained.load(Ordering::Relaxed), 40);
        assert_eq!(queue.stats().dequeued(), 40);
    }
}
