//! Console sink
//!
//! Synchronous writer executing on the producer's thread under a short-held
//! lock, so interleaved producers keep call order. Warn and error events go
//! to stderr, everything else to stdout.

use crate::core::error::Result;
use crate::core::event::Event;
use crate::core::format::LineFormat;
use crate::core::level::Severity;
use crate::sinks::Sink;
use colored::Colorize;
use parking_lot::Mutex;
use std::io::Write;

pub struct ConsoleSink {
    name: String,
    use_colors: bool,
    format: LineFormat,
    // Serializes whole lines across producer threads.
    lock: Mutex<()>,
}

impl ConsoleSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            use_colors: true,
            format: LineFormat::default(),
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: LineFormat) -> Self {
        self.format = format;
        self
    }

    fn render(&self, event: &Event) -> String {
        let line = self.format.format(event);
        if !self.use_colors {
            return line;
        }
        let level_str = format!("{:5}", event.level.to_str());
        line.replace(
            &level_str,
            &level_str.color(event.level.color_code()).to_string(),
        )
    }
}

impl Sink for ConsoleSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&self, event: &Event) -> Result<()> {
        let line = self.render(event);
        let _guard = self.lock.lock();
        match event.level {
            Severity::Warn | Severity::Error => {
                std::io::stderr().write_all(line.as_bytes())?;
            }
            _ => {
                std::io::stdout().write_all(line.as_bytes())?;
            }
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        let _guard = self.lock.lock();
        std::io::stdout().flush()?;
        std::io::stderr().flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::format::Stage;

    #[test]
    fn test_render_plain() {
        let sink = ConsoleSink::new("console")
            .with_colors(false)
            .with_format(LineFormat::new(vec![Stage::Level, Stage::Message, Stage::Newline]));
        let event = Event::new(Severity::Debug, "value=42".to_string());
        assert_eq!(sink.render(&event), "[DEBUG] value=42\n");
    }

    #[test]
    fn test_render_colored_keeps_message() {
        let sink = ConsoleSink::new("console");
        let event = Event::new(Severity::Error, "boom".to_string());
        let line = sink.render(&event);
        assert!(line.contains("boom"));
    }

    #[test]
    fn test_write_smoke() {
        let sink = ConsoleSink::new("console").with_colors(false);
        let event = Event::new(Severity::Info, "console smoke".to_string());
        sink.write(&event).expect("console write");
        sink.flush().expect("console flush");
    }
}
