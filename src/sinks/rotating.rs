//! Rotating file sink
//!
//! One sink, two rotation policies sharing the close-rename-reopen protocol
//! and backup retention:
//!
//! - **Size**: rotate when the running byte count would reach the limit.
//!   Backups are named `<path>.<cycle>.<timestamp>`.
//! - **Window**: rotate when the event timestamp, truncated to the window
//!   length, leaves the window the current file was opened in. Backups are
//!   named `<path>.<timestamp>`.
//!
//! The event that triggers a rotation is always written to the fresh file.
//! A failed rotation leaves the sink degraded: the write that hit it fails,
//! and every later write retries the reopen once until it succeeds (e.g.
//! after an operator frees disk space).

use crate::core::error::{LogError, Result};
use crate::core::event::Event;
use crate::core::format::LineFormat;
use crate::sinks::Sink;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// When to rotate the active file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationPolicy {
    /// Rotate before the running byte count reaches `max_bytes`.
    Size { max_bytes: u64 },
    /// Rotate whenever an event falls into a new wall-clock window.
    Window { every: Duration },
}

impl RotationPolicy {
    #[must_use]
    pub fn size(max_bytes: u64) -> Self {
        RotationPolicy::Size { max_bytes }
    }

    #[must_use]
    pub fn window(every: Duration) -> Self {
        RotationPolicy::Window { every }
    }

    fn window_secs(&self) -> Option<i64> {
        match self {
            RotationPolicy::Window { every } => Some((every.as_secs() as i64).max(1)),
            RotationPolicy::Size { .. } => None,
        }
    }
}

const BACKUP_TIMESTAMP: &str = "%Y%m%dT%H%M%S";

struct RotationState {
    writer: Option<BufWriter<File>>,
    /// Bytes written to the active file since the last rotation.
    written: u64,
    /// Truncated timestamp of the window the active file belongs to.
    window_start: i64,
    /// Rotation cycle counter, part of size-policy backup names.
    cycle: u64,
    /// Retained backup paths, oldest first. Never contains the active file.
    backups: VecDeque<PathBuf>,
}

/// File sink with crash-safe rotation and bounded backlog retention.
pub struct RotatingFileSink {
    name: String,
    path: PathBuf,
    policy: RotationPolicy,
    max_backups: usize,
    compress: bool,
    format: LineFormat,
    state: Mutex<RotationState>,
}

impl RotatingFileSink {
    /// Open (or create) the active file at `path`.
    pub fn new(
        name: impl Into<String>,
        path: impl AsRef<Path>,
        policy: RotationPolicy,
        max_backups: usize,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    LogError::io_operation(
                        "create log directory",
                        format!("Failed to create directory '{}'", parent.display()),
                        e,
                    )
                })?;
            }
        }

        let file = Self::open_active(&path)?;
        let written = file
            .metadata()
            .map_err(|e| {
                LogError::file_sink(
                    path.display().to_string(),
                    format!("Cannot access file metadata: {}", e),
                )
            })?
            .len();

        let window_secs = policy.window_secs();
        Ok(Self {
            name: name.into(),
            path,
            policy,
            max_backups,
            compress: false,
            format: LineFormat::default(),
            state: Mutex::new(RotationState {
                writer: Some(BufWriter::new(file)),
                written,
                window_start: window_secs
                    .map(|w| truncate(Utc::now(), w))
                    .unwrap_or(0),
                cycle: 0,
                backups: VecDeque::new(),
            }),
        })
    }

    /// Gzip each backup after rotation.
    #[must_use]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }

    /// Replace the formatting pipeline.
    #[must_use]
    pub fn with_format(mut self, format: LineFormat) -> Self {
        self.format = format;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    /// Retained backup paths, oldest first.
    pub fn backups(&self) -> Vec<PathBuf> {
        self.state.lock().backups.iter().cloned().collect()
    }

    /// Completed rotation cycles.
    pub fn cycles(&self) -> u64 {
        self.state.lock().cycle
    }

    fn open_active(path: &Path) -> Result<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                LogError::file_sink(
                    path.display().to_string(),
                    format!("Failed to open: {}", e),
                )
            })
    }

    fn backup_path(&self, state: &RotationState, at: DateTime<Utc>) -> PathBuf {
        let stamp = match &self.policy {
            RotationPolicy::Size { .. } => {
                format!("{}.{}", state.cycle, at.format(BACKUP_TIMESTAMP))
            }
            RotationPolicy::Window { .. } => {
                let start = chrono::DateTime::<Utc>::from_timestamp(state.window_start, 0)
                    .unwrap_or(at);
                start.format(BACKUP_TIMESTAMP).to_string()
            }
        };
        let mut path = self.path.clone();
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("app.log")
            .to_string();
        path.set_file_name(format!("{}.{}", filename, stamp));
        path
    }

    /// Whether `event` must land in a fresh file.
    fn should_rotate(&self, state: &RotationState, line_len: u64, event: &Event) -> bool {
        match &self.policy {
            RotationPolicy::Size { max_bytes } => {
                state.written > 0 && state.written + line_len >= *max_bytes
            }
            RotationPolicy::Window { every } => {
                let secs = (every.as_secs() as i64).max(1);
                truncate(event.timestamp, secs) != state.window_start
            }
        }
    }

    /// Close-rename-reopen. On failure the writer stays absent and the sink
    /// is degraded until a later write reopens the active file.
    fn rotate(&self, state: &mut RotationState, event_ts: DateTime<Utc>) -> Result<()> {
        if let Some(mut writer) = state.writer.take() {
            writer.flush().map_err(|e| {
                LogError::rotation(
                    self.path.display().to_string(),
                    format!("Failed to flush before rotation: {}", e),
                )
            })?;
        }

        let mut backup = self.backup_path(state, event_ts);
        if self.path.exists() {
            fs::rename(&self.path, &backup).map_err(|e| {
                LogError::rotation(
                    self.path.display().to_string(),
                    format!("Failed to move active file to '{}': {}", backup.display(), e),
                )
            })?;

            if self.compress {
                match compress_backup(&backup) {
                    Ok(gz) => backup = gz,
                    Err(e) => {
                        // The uncompressed backup is intact; keep it and move on.
                        eprintln!("[FANLOG WARN] backup compression failed: {}", e);
                    }
                }
            }

            state.backups.push_back(backup);
            while state.backups.len() > self.max_backups {
                if let Some(oldest) = state.backups.pop_front() {
                    if let Err(e) = fs::remove_file(&oldest) {
                        eprintln!(
                            "[FANLOG WARN] failed to remove oldest backup {}: {}",
                            oldest.display(),
                            e
                        );
                    }
                }
            }
        }

        let file = Self::open_active(&self.path).map_err(|e| {
            LogError::rotation(
                self.path.display().to_string(),
                format!("Failed to open new active file: {}", e),
            )
        })?;

        state.writer = Some(BufWriter::new(file));
        state.written = 0;
        state.cycle += 1;
        if let Some(secs) = self.policy.window_secs() {
            state.window_start = truncate(event_ts, secs);
        }
        Ok(())
    }
}

impl Sink for RotatingFileSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&self, event: &Event) -> Result<()> {
        let line = self.format.format(event);
        let line_len = line.len() as u64;

        let mut state = self.state.lock();

        if state.writer.is_none() {
            // Degraded after a failed rotation; retry the reopen once per
            // write so the sink recovers when the disk does.
            let file = Self::open_active(&self.path)?;
            state.written = file.metadata().map(|m| m.len()).unwrap_or(0);
            state.writer = Some(BufWriter::new(file));
        } else if self.should_rotate(&state, line_len, event) {
            self.rotate(&mut state, event.timestamp)?;
        }

        let path = &self.path;
        let writer = state
            .writer
            .as_mut()
            .ok_or_else(|| LogError::file_sink(path.display().to_string(), "writer not open"))?;
        writer.write_all(line.as_bytes()).map_err(|e| {
            LogError::file_sink(
                path.display().to_string(),
                format!("Failed to write log entry: {}", e),
            )
        })?;
        state.written += line_len;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(ref mut writer) = state.writer {
            writer.flush().map_err(|e| {
                LogError::file_sink(
                    self.path.display().to_string(),
                    format!("Failed to flush: {}", e),
                )
            })?;
        }
        Ok(())
    }

    fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(mut writer) = state.writer.take() {
            writer.flush().map_err(|e| {
                LogError::file_sink(
                    self.path.display().to_string(),
                    format!("Failed to flush on close: {}", e),
                )
            })?;
        }
        Ok(())
    }
}

impl Drop for RotatingFileSink {
    fn drop(&mut self) {
        if let Some(mut writer) = self.state.lock().writer.take() {
            let _ = writer.flush();
        }
    }
}

fn truncate(at: DateTime<Utc>, window_secs: i64) -> i64 {
    let secs = at.timestamp();
    secs - secs.rem_euclid(window_secs)
}

/// Gzip `path` into `<path>.gz` and remove the original. The original is
/// only removed after the compressed file is fully written.
fn compress_backup(path: &Path) -> Result<PathBuf> {
    use std::io::{BufReader, Read};

    let gz_path = {
        let mut p = path.as_os_str().to_owned();
        p.push(".gz");
        PathBuf::from(p)
    };

    let input = File::open(path).map_err(|e| {
        LogError::io_operation(
            "compress backup",
            format!("Failed to open '{}'", path.display()),
            e,
        )
    })?;
    let mut reader = BufReader::new(input);

    let output = File::create(&gz_path).map_err(|e| {
        LogError::io_operation(
            "compress backup",
            format!("Failed to create '{}'", gz_path.display()),
            e,
        )
    })?;
    let mut encoder = flate2::write::GzEncoder::new(
        BufWriter::new(output),
        flate2::Compression::default(),
    );

    let mut buffer = vec![0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buffer).map_err(|e| {
            let _ = fs::remove_file(&gz_path);
            LogError::io_operation("compress backup", "read failed", e)
        })?;
        if n == 0 {
            break;
        }
        encoder.write_all(&buffer[..n]).map_err(|e| {
            let _ = fs::remove_file(&gz_path);
            LogError::io_operation("compress backup", "write failed", e)
        })?;
    }
    encoder.finish().map_err(|e| {
        let _ = fs::remove_file(&gz_path);
        LogError::io_operation("compress backup", "finish failed", e)
    })?;

    if let Err(e) = fs::remove_file(path) {
        eprintln!(
            "[FANLOG WARN] compressed backup kept alongside original {}: {}",
            path.display(),
            e
        );
    }
    Ok(gz_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::format::Stage;
    use crate::core::level::Severity;
    use chrono::TimeZone;
    use tempfile::tempdir;

    /// Message-only lines keep byte accounting predictable.
    fn plain_format() -> LineFormat {
        LineFormat::new(vec![Stage::Message, Stage::Newline])
    }

    fn event(msg: &str) -> Event {
        Event::new(Severity::Info, msg.to_string())
    }

    fn event_at(msg: &str, secs: i64) -> Event {
        let mut e = Event::new(Severity::Info, msg.to_string());
        e.timestamp = Utc.timestamp_opt(secs, 0).unwrap();
        e
    }

    #[test]
    fn test_size_rotation_single_cross() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("app.log");
        // 10 bytes per line ("aaaaaaaaa\n"); limit allows two lines.
        let sink = RotatingFileSink::new("file", &path, RotationPolicy::size(25), 3)
            .expect("create sink")
            .with_format(plain_format());

        sink.write(&event("aaaaaaaaa")).expect("write 1");
        sink.write(&event("bbbbbbbbb")).expect("write 2");
        // 20 + 10 >= 25: rotates, and the triggering line lands in the
        // fresh file.
        sink.write(&event("ccccccccc")).expect("write 3");
        sink.flush().expect("flush");

        assert_eq!(sink.cycles(), 1);
        let backups = sink.backups();
        assert_eq!(backups.len(), 1);

        let rotated = fs::read_to_string(&backups[0]).expect("read backup");
        assert_eq!(rotated, "aaaaaaaaa\nbbbbbbbbb\n");
        let active = fs::read_to_string(&path).expect("read active");
        assert_eq!(active, "ccccccccc\n");
    }

    #[test]
    fn test_backup_retention_bound() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("app.log");
        let sink = RotatingFileSink::new("file", &path, RotationPolicy::size(15), 2)
            .expect("create sink")
            .with_format(plain_format());

        for n in 0..12 {
            sink.write(&event(&format!("message-{:02}", n))).expect("write");
        }
        sink.flush().expect("flush");

        let backups = sink.backups();
        assert!(backups.len() <= 2, "retention exceeded: {:?}", backups);
        for backup in &backups {
            assert!(backup.exists());
            assert_ne!(backup, &path);
        }
        assert!(sink.cycles() > 2);
    }

    #[test]
    fn test_window_rotation() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("app.log");
        let sink = RotatingFileSink::new(
            "file",
            &path,
            RotationPolicy::window(Duration::from_secs(3600)),
            4,
        )
        .expect("create sink")
        .with_format(plain_format());

        // Same hour window: no rotation between these two.
        sink.write(&event_at("first", 7_200)).expect("write");
        sink.write(&event_at("second", 7_800)).expect("write");
        assert_eq!(sink.cycles(), 1); // initial window differs from 1970 epoch hour

        let cycles_before = sink.cycles();
        // Next hour: exactly one rotation.
        sink.write(&event_at("third", 10_900)).expect("write");
        sink.flush().expect("flush");
        assert_eq!(sink.cycles(), cycles_before + 1);

        let active = fs::read_to_string(&path).expect("read active");
        assert_eq!(active, "third\n");
    }

    #[test]
    fn test_degraded_sink_surfaces_error_then_recovers() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("app.log");
        let sink = RotatingFileSink::new("file", &path, RotationPolicy::size(1024), 2)
            .expect("create sink")
            .with_format(plain_format());

        sink.close().expect("close");
        // Writer is gone; the next write reopens the active file.
        sink.write(&event("after close")).expect("reopen write");
        sink.flush().expect("flush");

        let active = fs::read_to_string(&path).expect("read active");
        assert!(active.contains("after close"));
    }

    #[test]
    fn test_compressed_backup_name() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("app.log");
        let sink = RotatingFileSink::new("file", &path, RotationPolicy::size(15), 2)
            .expect("create sink")
            .with_format(plain_format())
            .with_compression(true);

        sink.write(&event("aaaaaaaaaaaa")).expect("write");
        sink.write(&event("bbbbbbbbbbbb")).expect("write");
        sink.flush().expect("flush");

        let backups = sink.backups();
        assert_eq!(backups.len(), 1);
        assert!(backups[0].extension().map(|e| e == "gz").unwrap_or(false));
        assert!(backups[0].exists());
    }
}
