//! Asynchronous delivery wrapper
//!
//! Puts a bounded queue and a worker pool in front of any sink, so slow
//! destinations (disk, network) never run on the producer's thread. The
//! producer-facing `write` is a non-blocking enqueue; a full queue drops the
//! event and counts the rejection. Workers drain in bulk and push write
//! failures into the queue statistics.
//!
//! With more than one worker, per-sink ordering is traded for throughput;
//! configure exactly one worker when strict order matters.

use crate::core::error::Result;
use crate::core::event::Event;
use crate::core::queue::{EventQueue, QueueStats, WorkerPool};
use crate::sinks::Sink;
use std::sync::Arc;

const DRAIN_BATCH: usize = 64;

pub struct QueuedSink {
    name: String,
    inner: Arc<dyn Sink>,
    queue: Arc<EventQueue>,
    workers: WorkerPool,
}

impl QueuedSink {
    /// Wrap `inner` with a queue of `depth` events drained by `workers`
    /// threads.
    pub fn new(inner: Arc<dyn Sink>, depth: usize, workers: usize) -> Self {
        let queue = Arc::new(EventQueue::new(depth));
        let pool = WorkerPool::new();

        {
            let queue = Arc::clone(&queue);
            let inner = Arc::clone(&inner);
            pool.spawn(workers.max(1), move || loop {
                let (batch, still_open) = queue.pop_front_bulk(DRAIN_BATCH);
                for event in &batch {
                    if inner.write(event).is_err() {
                        queue.stats().record_write_errors(1);
                    }
                }
                if !batch.is_empty() {
                    let _ = inner.flush();
                }
                if !still_open {
                    break;
                }
            });
        }

        Self {
            name: format!("{}+queue", inner.name()),
            inner,
            queue,
            workers: pool,
        }
    }

    /// Queue statistics: accepted, drained, rejected, and failed writes.
    pub fn stats(&self) -> &Arc<QueueStats> {
        self.queue.stats()
    }
}

impl Sink for QueuedSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&self, event: &Event) -> Result<()> {
        // Full or closed queues drop the event; the rejection is counted and
        // the producer is never blocked or failed.
        self.queue.push_back(event.clone());
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.inner.flush()
    }

    /// Close intake, wait for workers to finish draining, then close the
    /// wrapped sink. No worker is still writing when this returns.
    fn close(&self) -> Result<()> {
        self.queue.close();
        self.workers.join();
        self.inner.close()
    }
}
