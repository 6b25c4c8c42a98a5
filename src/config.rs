//! Declarative sink wiring
//!
//! Descriptors for the sinks a deployment wants, consumable from any
//! configuration source that can deserialize into them (YAML, TOML, env
//! layering — parsing itself happens outside this crate). `apply` turns a
//! descriptor list into live registrations on a logger.

use crate::core::error::Result;
use crate::core::level::Severity;
use crate::core::limiter::WindowLimiter;
use crate::core::logger::Logger;
use crate::sinks::rotating::{RotatingFileSink, RotationPolicy};
use crate::sinks::{CaptureSink, QueuedSink};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

fn default_queue_depth() -> usize {
    1024
}

fn default_workers() -> usize {
    1
}

fn default_batch_size() -> usize {
    32
}

fn default_delay_ms() -> u64 {
    100
}

/// Admission-control settings for an HTTP sink.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSpec {
    /// Bucket width in seconds.
    pub granularity_secs: u64,
    /// Bucket retention in seconds.
    pub ttl_secs: u64,
    /// Batches admitted per live window.
    pub ceiling: u64,
}

/// One sink to register, as a deployment would declare it.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkSpec {
    /// Synchronous console writer.
    Console {
        name: String,
        level: Severity,
        #[serde(default)]
        no_colors: bool,
    },

    /// Rotating file, byte-threshold policy, behind a queue.
    FileSize {
        name: String,
        level: Severity,
        path: String,
        max_bytes: u64,
        backups: usize,
        #[serde(default)]
        compress: bool,
        #[serde(default = "default_queue_depth")]
        queue_depth: usize,
        #[serde(default = "default_workers")]
        workers: usize,
    },

    /// Rotating file, wall-clock-window policy, behind a queue.
    FileWindow {
        name: String,
        level: Severity,
        path: String,
        window_secs: u64,
        backups: usize,
        #[serde(default)]
        compress: bool,
        #[serde(default = "default_queue_depth")]
        queue_depth: usize,
        #[serde(default = "default_workers")]
        workers: usize,
    },

    /// Batched HTTP delivery to a rotating endpoint list.
    Http {
        name: String,
        level: Severity,
        urls: Vec<String>,
        #[serde(default = "default_batch_size")]
        batch_size: usize,
        #[serde(default = "default_queue_depth")]
        queue_depth: usize,
        #[serde(default = "default_workers")]
        workers: usize,
        #[serde(default = "default_delay_ms")]
        delay_ms: u64,
        #[serde(default)]
        headers: Vec<(String, String)>,
        #[serde(default)]
        rate_limit: Option<RateLimitSpec>,
        #[serde(default)]
        json: bool,
    },

    /// Per-request circular-buffer capture.
    Capture { name: String, level: Severity },
}

impl SinkSpec {
    pub fn name(&self) -> &str {
        match self {
            SinkSpec::Console { name, .. }
            | SinkSpec::FileSize { name, .. }
            | SinkSpec::FileWindow { name, .. }
            | SinkSpec::Http { name, .. }
            | SinkSpec::Capture { name, .. } => name,
        }
    }
}

/// Register every described sink on `logger`. Stops at the first descriptor
/// that fails to build; sinks registered before the failure stay registered.
pub fn apply(logger: &Logger, specs: &[SinkSpec]) -> Result<()> {
    for spec in specs {
        match spec {
            SinkSpec::Console { name, level, no_colors } => {
                #[cfg(feature = "console")]
                {
                    let sink = crate::sinks::ConsoleSink::new(name.clone())
                        .with_colors(!no_colors);
                    logger.add_output(name.clone(), *level, Arc::new(sink));
                }
                #[cfg(not(feature = "console"))]
                {
                    let _ = no_colors;
                    return Err(crate::core::error::LogError::config(
                        name.clone(),
                        "console sinks require the 'console' feature",
                    ));
                }
            }

            SinkSpec::FileSize {
                name,
                level,
                path,
                max_bytes,
                backups,
                compress,
                queue_depth,
                workers,
            } => {
                let file = RotatingFileSink::new(
                    name.clone(),
                    path,
                    RotationPolicy::size(*max_bytes),
                    *backups,
                )?
                .with_compression(*compress);
                let sink = QueuedSink::new(Arc::new(file), *queue_depth, *workers);
                logger.add_output(name.clone(), *level, Arc::new(sink));
            }

            SinkSpec::FileWindow {
                name,
                level,
                path,
                window_secs,
                backups,
                compress,
                queue_depth,
                workers,
            } => {
                let file = RotatingFileSink::new(
                    name.clone(),
                    path,
                    RotationPolicy::window(Duration::from_secs(*window_secs)),
                    *backups,
                )?
                .with_compression(*compress);
                let sink = QueuedSink::new(Arc::new(file), *queue_depth, *workers);
                logger.add_output(name.clone(), *level, Arc::new(sink));
            }

            SinkSpec::Http {
                name,
                level,
                urls,
                batch_size,
                queue_depth,
                workers,
                delay_ms,
                headers,
                rate_limit,
                json,
            } => {
                #[cfg(feature = "http")]
                {
                    let transport = Arc::new(crate::sinks::ReqwestTransport::new(
                        Duration::from_secs(5),
                    )?);
                    let mut builder =
                        crate::sinks::HttpBatchSink::builder(name.clone(), transport)
                            .urls(urls.clone())
                            .batch_size(*batch_size)
                            .queue_depth(*queue_depth)
                            .workers(*workers)
                            .delay(Duration::from_millis(*delay_ms));
                    for (key, value) in headers {
                        builder = builder.header(key.clone(), value.clone());
                    }
                    if let Some(limit) = rate_limit {
                        builder = builder.limiter(Arc::new(WindowLimiter::new(
                            Duration::from_secs(limit.granularity_secs),
                            Duration::from_secs(limit.ttl_secs),
                            limit.ceiling,
                        )));
                    }
                    if *json {
                        builder = builder.batch_format(crate::sinks::BatchFormat::Json);
                    }
                    logger.add_output(name.clone(), *level, Arc::new(builder.build()?));
                }
                #[cfg(not(feature = "http"))]
                {
                    let _ = (
                        urls, batch_size, queue_depth, workers, delay_ms, headers,
                        rate_limit, json,
                    );
                    return Err(crate::core::error::LogError::config(
                        name.clone(),
                        "http sinks require the 'http' feature",
                    ));
                }
            }

            SinkSpec::Capture { name, level } => {
                logger.add_output(name.clone(), *level, Arc::new(CaptureSink::new(name.clone())));
            }
        }
    }
    Ok(())
}
