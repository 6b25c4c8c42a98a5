//! Core engine: events, routing, queueing, admission control

pub mod context;
pub mod error;
pub mod event;
pub mod format;
pub mod level;
pub mod limiter;
pub mod logger;
pub mod queue;
pub mod router;

pub use context::{RequestContext, TraceRing};
pub use error::{LogError, Result};
pub use event::Event;
pub use format::{json_event, LineFormat, Stage, DEFAULT_TIMESTAMP};
pub use level::{Severity, SEVERITY_COUNT};
pub use limiter::WindowLimiter;
pub use logger::{default_logger, init_default, Logger};
pub use queue::{EventQueue, QueueStats, WorkerPool};
pub use router::{DispatchMetrics, RoutingTable};
