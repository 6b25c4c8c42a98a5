//! Sink implementations for log event destinations

pub mod capture;
#[cfg(feature = "console")]
pub mod console;
pub mod http;
pub mod queued;
pub mod rotating;

use crate::core::error::Result;
use crate::core::event::Event;

/// A named destination for log events.
///
/// Sinks are shared by routing snapshots across producer threads, so `write`
/// takes `&self`; implementations guard their mutable state with a sink-local
/// lock or an internal queue.
pub trait Sink: Send + Sync {
    fn name(&self) -> &str;

    /// Deliver one event. Synchronous sinks write inline; asynchronous sinks
    /// enqueue and return immediately.
    fn write(&self, event: &Event) -> Result<()>;

    /// Push buffered output down to the underlying device.
    fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Stop accepting events, drain pending work, and release resources.
    /// Must be safe to call more than once.
    fn close(&self) -> Result<()> {
        Ok(())
    }
}

pub use capture::CaptureSink;
#[cfg(feature = "console")]
pub use console::ConsoleSink;
pub use http::{BatchFormat, HttpBatchSink, HttpBatchSinkBuilder, HttpTransport};
#[cfg(feature = "http")]
pub use http::ReqwestTransport;
pub use queued::QueuedSink;
pub use rotating::{RotatingFileSink, RotationPolicy};
