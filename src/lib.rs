//! # Fanlog
//!
//! An embeddable, asynchronous logging engine that fans each log event out
//! to multiple heterogeneous sinks with independent per-sink severity
//! filtering, backpressure, and failure isolation.
//!
//! ## Features
//!
//! - **Lock-free routing**: producers publish through an atomic snapshot
//!   and never block on sink reconfiguration
//! - **Bounded queues**: slow sinks get a queue and a worker pool; a full
//!   queue drops and counts instead of stalling the producer
//! - **Rotating files**: byte-threshold and wall-clock-window rotation with
//!   bounded backup retention
//! - **Batched HTTP shipping**: endpoint failover, admission-control rate
//!   limiting, per-batch error accounting
//! - **Request diagnostics**: a per-request ring of recent events reachable
//!   through an explicit context handle

pub mod config;
pub mod core;
pub mod macros;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        default_logger, init_default, DispatchMetrics, Event, EventQueue, LineFormat, LogError,
        Logger, QueueStats, RequestContext, Result, RoutingTable, Severity, Stage, TraceRing,
        WindowLimiter, WorkerPool,
    };
    pub use crate::sinks::{
        BatchFormat, CaptureSink, HttpBatchSink, HttpBatchSinkBuilder, HttpTransport, QueuedSink,
        RotatingFileSink, RotationPolicy, Sink,
    };
    #[cfg(feature = "console")]
    pub use crate::sinks::ConsoleSink;
    #[cfg(feature = "http")]
    pub use crate::sinks::ReqwestTransport;
}

pub use config::{apply, SinkSpec};
pub use core::{
    default_logger, init_default, json_event, DispatchMetrics, Event, EventQueue, LineFormat,
    LogError, Logger, QueueStats, RequestContext, Result, RoutingTable, Severity, Stage,
    TraceRing, WindowLimiter, WorkerPool, DEFAULT_TIMESTAMP, SEVERITY_COUNT,
};
pub use sinks::{
    BatchFormat, CaptureSink, HttpBatchSink, HttpBatchSinkBuilder, HttpTransport, QueuedSink,
    RotatingFileSink, RotationPolicy, Sink,
};
#[cfg(feature = "console")]
pub use sinks::ConsoleSink;
#[cfg(feature = "http")]
pub use sinks::ReqwestTransport;
