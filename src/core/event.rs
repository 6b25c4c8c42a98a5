//! Log event structure

use super::context::RequestContext;
use super::level::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single log event. Created once per log call and read-only afterwards;
/// ownership moves into a sink's queue on enqueue, sinks read it by reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub level: Severity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub file: Option<String>,
    pub line: Option<u32>,
    /// Request handle for correlation and diagnostic capture. Not serialized;
    /// the correlation id travels through the formatter instead.
    #[serde(skip)]
    pub context: Option<RequestContext>,
}

impl Event {
    /// Sanitize a log message to prevent log injection.
    ///
    /// Newlines, carriage returns, and tabs become escape sequences so a
    /// message cannot forge additional log lines.
    fn sanitize_message(message: &str) -> String {
        message
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t")
    }

    pub fn new(level: Severity, message: String) -> Self {
        Self {
            level,
            message: Self::sanitize_message(&message),
            timestamp: Utc::now(),
            file: None,
            line: None,
            context: None,
        }
    }

    pub fn with_location(mut self, file: &str, line: u32) -> Self {
        self.file = Some(file.to_string());
        self.line = Some(line);
        self
    }

    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Correlation id of the originating request, if any.
    pub fn correlation_id(&self) -> Option<&str> {
        self.context.as_ref().map(|ctx| ctx.correlation_id())
    }
}
