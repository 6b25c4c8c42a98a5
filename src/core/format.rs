//! Line formatting pipeline
//!
//! A formatted log line is produced by running an event through an ordered
//! list of stages. Each stage renders one fragment (timestamp, location,
//! severity name, correlation id, message, trailing newline). Sinks hold
//! their own pipeline, so a console sink and a file sink can render the same
//! event differently.

use super::event::Event;

/// One fragment of a formatted line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    /// Event timestamp rendered with a strftime-compatible format string.
    Timestamp(String),
    /// `file:line` of the originating log call, omitted when unknown.
    Location,
    /// Upper-case severity name, space-padded to five columns.
    Level,
    /// Correlation id of the originating request, omitted when absent.
    Correlation,
    /// The rendered message.
    Message,
    /// Line terminator.
    Newline,
}

impl Stage {
    fn render(&self, event: &Event, out: &mut String) {
        match self {
            Stage::Timestamp(fmt) => {
                out.push('[');
                out.push_str(&event.timestamp.format(fmt).to_string());
                out.push(']');
            }
            Stage::Location => {
                if let (Some(file), Some(line)) = (&event.file, event.line) {
                    out.push('(');
                    out.push_str(file);
                    out.push(':');
                    out.push_str(&line.to_string());
                    out.push(')');
                }
            }
            Stage::Level => {
                out.push('[');
                out.push_str(&format!("{:5}", event.level.to_str()));
                out.push(']');
            }
            Stage::Correlation => {
                if let Some(id) = event.correlation_id() {
                    out.push('<');
                    out.push_str(id);
                    out.push('>');
                }
            }
            Stage::Message => out.push_str(&event.message),
            Stage::Newline => out.push('\n'),
        }
    }
}

/// Default timestamp format, millisecond precision UTC.
pub const DEFAULT_TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Ordered formatting pipeline.
#[derive(Debug, Clone)]
pub struct LineFormat {
    stages: Vec<Stage>,
}

impl LineFormat {
    /// Pipeline with explicit stages, in render order.
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    /// Render one event to a line.
    pub fn format(&self, event: &Event) -> String {
        let mut out = String::with_capacity(event.message.len() + 64);
        for (idx, stage) in self.stages.iter().enumerate() {
            let len_before = out.len();
            stage.render(event, &mut out);
            // Separate fragments with a single space, but never before the
            // terminator and never after a stage that rendered nothing.
            if out.len() > len_before
                && !matches!(stage, Stage::Newline)
                && self.stages[idx + 1..]
                    .iter()
                    .any(|s| !matches!(s, Stage::Newline))
            {
                out.push(' ');
            }
        }
        // Trim the trailing separator left when the remaining stages rendered
        // nothing.
        while out.ends_with(' ') {
            out.pop();
        }
        out
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }
}

impl Default for LineFormat {
    /// `[timestamp] [LEVEL] (file:line) <correlation> message\n`
    fn default() -> Self {
        Self::new(vec![
            Stage::Timestamp(DEFAULT_TIMESTAMP.to_string()),
            Stage::Level,
            Stage::Location,
            Stage::Correlation,
            Stage::Message,
            Stage::Newline,
        ])
    }
}

/// Render one event as a JSON object, used by the HTTP shipper's
/// record-delimited JSON batch body.
pub fn json_event(event: &Event) -> serde_json::Value {
    let mut obj = serde_json::Map::new();
    obj.insert(
        "timestamp".to_string(),
        serde_json::Value::String(event.timestamp.to_rfc3339()),
    );
    obj.insert(
        "level".to_string(),
        serde_json::Value::String(event.level.to_str().to_string()),
    );
    obj.insert(
        "message".to_string(),
        serde_json::Value::String(event.message.clone()),
    );
    if let Some(ref file) = event.file {
        obj.insert("file".to_string(), serde_json::Value::String(file.clone()));
    }
    if let Some(line) = event.line {
        obj.insert("line".to_string(), serde_json::Value::Number(line.into()));
    }
    if let Some(id) = event.correlation_id() {
        obj.insert(
            "correlation_id".to_string(),
            serde_json::Value::String(id.to_string()),
        );
    }
    serde_json::Value::Object(obj)
}
