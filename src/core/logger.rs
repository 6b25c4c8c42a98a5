//! Logger facade over the routing table

use super::context::RequestContext;
use super::error::{LogError, Result};
use super::event::Event;
use super::level::Severity;
use super::router::{DispatchMetrics, RoutingTable};
use crate::sinks::Sink;
use std::sync::{Arc, OnceLock};

/// Front door for producers: registration on one side, the severity-keyed
/// producer API on the other.
///
/// Logging never fails from the caller's point of view; sink and queue
/// failures degrade to counters reachable through [`Logger::metrics`] and
/// the individual sinks' statistics. Call [`Logger::shutdown`] before
/// process exit so asynchronous sinks drain.
pub struct Logger {
    table: RoutingTable,
}

impl Logger {
    pub fn new() -> Self {
        Self {
            table: RoutingTable::new(),
        }
    }

    /// Register or replace a named sink receiving events at `level` and
    /// above.
    pub fn add_output(&self, name: impl Into<String>, level: Severity, sink: Arc<dyn Sink>) {
        self.table.add_output(name, level, sink);
    }

    /// Remove a named sink from every severity bucket.
    pub fn del_output(&self, name: &str) {
        self.table.del_output(name);
    }

    /// Drop every registration.
    pub fn clear(&self) {
        self.table.clear();
    }

    /// Whether anything is listening at `level`. Callers can use this to
    /// skip expensive argument rendering.
    pub fn enabled(&self, level: Severity) -> bool {
        self.table.is_routed(level)
    }

    /// Core entry point used by the macro layer.
    pub fn log_at(
        &self,
        level: Severity,
        file: &str,
        line: u32,
        message: String,
        ctx: Option<&RequestContext>,
    ) {
        if !self.table.is_routed(level) {
            return;
        }

        let mut event = Event::new(level, message).with_location(file, line);
        if let Some(ctx) = ctx {
            event = event.with_context(ctx.clone());
        }
        self.table.dispatch(level, &event);
    }

    /// Log a pre-rendered message without source location.
    pub fn log(&self, level: Severity, message: impl Into<String>) {
        if !self.table.is_routed(level) {
            return;
        }
        let event = Event::new(level, message.into());
        self.table.dispatch(level, &event);
    }

    /// Log with a request context attached for correlation and capture.
    pub fn log_with(&self, level: Severity, ctx: &RequestContext, message: impl Into<String>) {
        if !self.table.is_routed(level) {
            return;
        }
        let event = Event::new(level, message.into()).with_context(ctx.clone());
        self.table.dispatch(level, &event);
    }

    #[inline]
    pub fn trace(&self, message: impl Into<String>) {
        self.log(Severity::Trace, message);
    }

    #[inline]
    pub fn debug(&self, message: impl Into<String>) {
        self.log(Severity::Debug, message);
    }

    #[inline]
    pub fn info(&self, message: impl Into<String>) {
        self.log(Severity::Info, message);
    }

    #[inline]
    pub fn warn(&self, message: impl Into<String>) {
        self.log(Severity::Warn, message);
    }

    #[inline]
    pub fn error(&self, message: impl Into<String>) {
        self.log(Severity::Error, message);
    }

    #[inline]
    pub fn trace_with(&self, ctx: &RequestContext, message: impl Into<String>) {
        self.log_with(Severity::Trace, ctx, message);
    }

    #[inline]
    pub fn debug_with(&self, ctx: &RequestContext, message: impl Into<String>) {
        self.log_with(Severity::Debug, ctx, message);
    }

    #[inline]
    pub fn info_with(&self, ctx: &RequestContext, message: impl Into<String>) {
        self.log_with(Severity::Info, ctx, message);
    }

    #[inline]
    pub fn warn_with(&self, ctx: &RequestContext, message: impl Into<String>) {
        self.log_with(Severity::Warn, ctx, message);
    }

    #[inline]
    pub fn error_with(&self, ctx: &RequestContext, message: impl Into<String>) {
        self.log_with(Severity::Error, ctx, message);
    }

    /// Dispatch counters.
    pub fn metrics(&self) -> &Arc<DispatchMetrics> {
        self.table.metrics()
    }

    /// Direct access to the routing table, for wiring layers that manage
    /// registrations themselves.
    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    /// Flush and close every registered sink exactly once, then clear the
    /// table. Errors are collected and returned together; the first failing
    /// sink never prevents the rest from closing.
    pub fn shutdown(&self) -> Result<()> {
        let mut errors = Vec::new();
        for (name, sink) in self.table.outputs() {
            if let Err(e) = sink.flush() {
                errors.push(format!("{}: flush: {}", name, e));
            }
            if let Err(e) = sink.close() {
                errors.push(format!("{}: close: {}", name, e));
            }
        }
        self.table.clear();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(LogError::Shutdown { errors })
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

static DEFAULT_LOGGER: OnceLock<Logger> = OnceLock::new();

/// Install the process-wide default logger. Succeeds exactly once; a second
/// call returns the rejected logger so the caller can decide what to do
/// with its sinks.
pub fn init_default(logger: Logger) -> std::result::Result<(), Logger> {
    DEFAULT_LOGGER.set(logger)
}

/// The process-wide default logger, if one was installed.
pub fn default_logger() -> Option<&'static Logger> {
    DEFAULT_LOGGER.get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct MemorySink {
        lines: Mutex<Vec<String>>,
        closed: Mutex<u32>,
    }

    impl MemorySink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                lines: Mutex::new(Vec::new()),
                closed: Mutex::new(0),
            })
        }
    }

    impl Sink for MemorySink {
        fn name(&self) -> &str {
            "memory"
        }

        fn write(&self, event: &Event) -> Result<()> {
            self.lines.lock().push(format!("{} {}", event.level, event.message));
            Ok(())
        }

        fn close(&self) -> Result<()> {
            *self.closed.lock() += 1;
            Ok(())
        }
    }

    struct FailingSink;

    impl Sink for FailingSink {
        fn name(&self) -> &str {
            "failing"
        }

        fn write(&self, _event: &Event) -> Result<()> {
            Err(LogError::sink("failing", "write refused"))
        }

        fn close(&self) -> Result<()> {
            Err(LogError::sink("failing", "close refused"))
        }
    }

    #[test]
    fn test_severity_filtering() {
        let logger = Logger::new();
        let sink = MemorySink::new();
        logger.add_output("memory", Severity::Warn, sink.clone());

        logger.debug("dropped");
        logger.info("dropped");
        logger.warn("kept");
        logger.error("kept too");

        assert_eq!(sink.lines.lock().as_slice(), ["WARN kept", "ERROR kept too"]);
    }

    #[test]
    fn test_write_failure_counted_not_raised() {
        let logger = Logger::new();
        logger.add_output("failing", Severity::Trace, Arc::new(FailingSink));

        logger.info("goes nowhere");
        assert_eq!(logger.metrics().sink_errors(), 1);
    }

    #[test]
    fn test_shutdown_aggregates_errors() {
        let logger = Logger::new();
        let sink = MemorySink::new();
        logger.add_output("memory", Severity::Trace, sink.clone());
        logger.add_output("failing", Severity::Trace, Arc::new(FailingSink));

        let err = logger.shutdown().expect_err("failing sink must surface");
        match err {
            LogError::Shutdown { errors } => assert_eq!(errors.len(), 1),
            other => panic!("unexpected error: {}", other),
        }

        // The healthy sink was still closed, and the table is empty.
        assert_eq!(*sink.closed.lock(), 1);
        assert!(!logger.enabled(Severity::Error));
    }

    #[test]
    fn test_log_with_context_attaches_correlation() {
        let logger = Logger::new();
        let sink = MemorySink::new();
        logger.add_output("memory", Severity::Trace, sink.clone());

        let ctx = RequestContext::new("req-11", 4);
        logger.info_with(&ctx, "tagged");

        assert_eq!(sink.lines.lock().len(), 1);
    }
}
