//! Logging macros for ergonomic message formatting.
//!
//! Each macro renders its format arguments eagerly, captures the call site's
//! `file!()`/`line!()`, and hands the result to the logger. The `_ctx`
//! variants attach a request context for correlation and circular-buffer
//! capture.
//!
//! # Examples
//!
//! ```
//! use fanlog::prelude::*;
//! use fanlog::{info, warn_ctx};
//!
//! let logger = Logger::new();
//!
//! let port = 8080;
//! info!(logger, "server listening on port {}", port);
//!
//! let ctx = RequestContext::new("req-1", 32);
//! warn_ctx!(logger, ctx, "slow handler: {}ms", 750);
//! ```

/// Log a message at an explicit severity with automatic formatting.
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.log_at($level, file!(), line!(), format!($($arg)+), None)
    };
}

/// Log at an explicit severity with a request context attached.
#[macro_export]
macro_rules! log_ctx {
    ($logger:expr, $level:expr, $ctx:expr, $($arg:tt)+) => {
        $logger.log_at($level, file!(), line!(), format!($($arg)+), Some(&$ctx))
    };
}

/// Log a trace-level message.
#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Severity::Trace, $($arg)+)
    };
}

/// Log a debug-level message.
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Severity::Debug, $($arg)+)
    };
}

/// Log an info-level message.
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Severity::Info, $($arg)+)
    };
}

/// Log a warning-level message.
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Severity::Warn, $($arg)+)
    };
}

/// Log an error-level message.
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Severity::Error, $($arg)+)
    };
}

/// Log a trace-level message with a request context.
#[macro_export]
macro_rules! trace_ctx {
    ($logger:expr, $ctx:expr, $($arg:tt)+) => {
        $crate::log_ctx!($logger, $crate::Severity::Trace, $ctx, $($arg)+)
    };
}

/// Log a debug-level message with a request context.
#[macro_export]
macro_rules! debug_ctx {
    ($logger:expr, $ctx:expr, $($arg:tt)+) => {
        $crate::log_ctx!($logger, $crate::Severity::Debug, $ctx, $($arg)+)
    };
}

/// Log an info-level message with a request context.
#[macro_export]
macro_rules! info_ctx {
    ($logger:expr, $ctx:expr, $($arg:tt)+) => {
        $crate::log_ctx!($logger, $crate::Severity::Info, $ctx, $($arg)+)
    };
}

/// Log a warning-level message with a request context.
#[macro_export]
macro_rules! warn_ctx {
    ($logger:expr, $ctx:expr, $($arg:tt)+) => {
        $crate::log_ctx!($logger, $crate::Severity::Warn, $ctx, $($arg)+)
    };
}

/// Log an error-level message with a request context.
#[macro_export]
macro_rules! error_ctx {
    ($logger:expr, $ctx:expr, $($arg:tt)+) => {
        $crate::log_ctx!($logger, $crate::Severity::Error, $ctx, $($arg)+)
    };
}
