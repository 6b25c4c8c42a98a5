//! Request-capture sink
//!
//! Records each dispatched event into the circular buffer of the request it
//! originated from. Registered like any other sink, usually at `Trace` so a
//! request's ring sees everything regardless of what the other sinks keep.
//! Events without a request context pass through untouched.

use crate::core::error::Result;
use crate::core::event::Event;
use crate::sinks::Sink;

pub struct CaptureSink {
    name: String,
}

impl CaptureSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Sink for CaptureSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&self, event: &Event) -> Result<()> {
        if let Some(ctx) = &event.context {
            ctx.trace().record(event.clone());
        }
        Ok(())
    }
}
