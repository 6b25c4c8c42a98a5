//! Batched HTTP shipper
//!
//! A pool of workers drains the sink's queue, renders each batch into one
//! request body, and POSTs it to a rotating list of candidate endpoints.
//! Candidates are tried in order starting from a per-batch cursor so
//! repeated batches spread load across collectors; a network error or a
//! status of 400 or above fails that candidate and the next one is tried.
//! Only when every candidate fails is the batch's event count recorded as
//! write errors. An optional admission-control limiter rejects whole
//! batches before any request is made, counted separately from write
//! failures. Delivery is best effort: there is no durable retry queue.

use crate::core::error::{LogError, Result};
use crate::core::event::Event;
use crate::core::format::{json_event, LineFormat};
use crate::core::limiter::WindowLimiter;
use crate::core::queue::{EventQueue, QueueStats, WorkerPool};
use crate::sinks::Sink;
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Abstract POST transport, so the shipper is testable without a network
/// and transport construction (TLS, dialer options) stays outside the core.
pub trait HttpTransport: Send + Sync {
    /// POST `body` to `url` and return the response status code. A transport
    /// error (connect, timeout) is an `Err`; any answered request is `Ok`.
    fn post(&self, url: &str, headers: &[(String, String)], body: &str) -> Result<u16>;
}

/// Shape of the request body. Either way the batch is record-delimited:
/// one line per event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchFormat {
    /// Newline-delimited formatted lines.
    Lines,
    /// One JSON object per event, newline-delimited.
    Json,
}

struct Shipper {
    urls: Vec<String>,
    headers: Vec<(String, String)>,
    transport: Arc<dyn HttpTransport>,
    limiter: Option<Arc<WindowLimiter>>,
    batch_format: BatchFormat,
    line_format: LineFormat,
    cursor: AtomicUsize,
}

impl Shipper {
    fn body(&self, batch: &[Event]) -> String {
        match self.batch_format {
            BatchFormat::Lines => {
                let mut body = String::new();
                for event in batch {
                    body.push_str(&self.line_format.format(event));
                }
                body
            }
            BatchFormat::Json => {
                let mut body = String::new();
                for event in batch {
                    body.push_str(&json_event(event).to_string());
                    body.push('\n');
                }
                body
            }
        }
    }

    /// Deliver one batch, counting the outcome into `stats`.
    fn ship(&self, batch: &[Event], stats: &QueueStats) {
        if let Some(limiter) = &self.limiter {
            if !limiter.admit(Utc::now()) {
                stats.record_rate_limited(batch.len() as u64);
                return;
            }
        }

        let body = self.body(batch);
        let start = self.cursor.fetch_add(1, Ordering::Relaxed) % self.urls.len();

        for offset in 0..self.urls.len() {
            let url = &self.urls[(start + offset) % self.urls.len()];
            match self.transport.post(url, &self.headers, &body) {
                Ok(status) if (200..400).contains(&status) => return,
                Ok(_status) => continue,
                Err(_) => continue,
            }
        }
        stats.record_write_errors(batch.len() as u64);
    }
}

/// Builder for [`HttpBatchSink`].
pub struct HttpBatchSinkBuilder {
    name: String,
    urls: Vec<String>,
    transport: Arc<dyn HttpTransport>,
    headers: Vec<(String, String)>,
    limiter: Option<Arc<WindowLimiter>>,
    batch_format: BatchFormat,
    line_format: LineFormat,
    batch_size: usize,
    workers: usize,
    queue_depth: usize,
    delay: Duration,
}

impl HttpBatchSinkBuilder {
    pub fn new(name: impl Into<String>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            name: name.into(),
            urls: Vec::new(),
            transport,
            headers: Vec::new(),
            limiter: None,
            batch_format: BatchFormat::Lines,
            line_format: LineFormat::default(),
            batch_size: 32,
            workers: 1,
            queue_depth: 1024,
            delay: Duration::from_millis(100),
        }
    }

    /// Candidate endpoints, tried in rotation.
    #[must_use]
    pub fn urls(mut self, urls: Vec<String>) -> Self {
        self.urls = urls;
        self
    }

    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn limiter(mut self, limiter: Arc<WindowLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    #[must_use]
    pub fn batch_format(mut self, format: BatchFormat) -> Self {
        self.batch_format = format;
        self
    }

    #[must_use]
    pub fn line_format(mut self, format: LineFormat) -> Self {
        self.line_format = format;
        self
    }

    #[must_use]
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    #[must_use]
    pub fn queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth.max(1);
        self
    }

    /// Pause applied after every batch, regardless of outcome.
    #[must_use]
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn build(mut self) -> Result<HttpBatchSink> {
        if self.urls.is_empty() {
            return Err(LogError::config("HttpBatchSink", "empty URL list"));
        }

        if !self
            .headers
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case("content-type"))
        {
            let content_type = match self.batch_format {
                BatchFormat::Lines => "text/plain; charset=utf-8",
                BatchFormat::Json => "application/x-ndjson",
            };
            self.headers
                .push(("Content-Type".to_string(), content_type.to_string()));
        }

        let shipper = Arc::new(Shipper {
            urls: self.urls,
            headers: self.headers,
            transport: self.transport,
            limiter: self.limiter,
            batch_format: self.batch_format,
            line_format: self.line_format,
            cursor: AtomicUsize::new(0),
        });

        let queue = Arc::new(EventQueue::new(self.queue_depth));
        let pool = WorkerPool::new();
        {
            let queue = Arc::clone(&queue);
            let shipper = Arc::clone(&shipper);
            let batch_size = self.batch_size;
            let delay = self.delay;
            pool.spawn(self.workers, move || loop {
                let (batch, still_open) = queue.pop_front_bulk(batch_size);
                if !batch.is_empty() {
                    shipper.ship(&batch, queue.stats());
                    if !delay.is_zero() {
                        thread::sleep(delay);
                    }
                }
                if !still_open {
                    break;
                }
            });
        }

        Ok(HttpBatchSink {
            name: self.name,
            queue,
            workers: pool,
        })
    }
}

/// Asynchronous sink delivering batches to external log collectors.
pub struct HttpBatchSink {
    name: String,
    queue: Arc<EventQueue>,
    workers: WorkerPool,
}

impl HttpBatchSink {
    pub fn builder(
        name: impl Into<String>,
        transport: Arc<dyn HttpTransport>,
    ) -> HttpBatchSinkBuilder {
        HttpBatchSinkBuilder::new(name, transport)
    }

    /// Queue statistics, including `write_errors` and `rate_limited`.
    pub fn stats(&self) -> &Arc<QueueStats> {
        self.queue.stats()
    }
}

impl Sink for HttpBatchSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&self, event: &Event) -> Result<()> {
        // Non-blocking; a full queue drops and counts, never stalls the
        // producer.
        self.queue.push_back(event.clone());
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.queue.close();
        self.workers.join();
        Ok(())
    }
}

/// Blocking `reqwest` transport.
#[cfg(feature = "http")]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "http")]
impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LogError::config("ReqwestTransport", e.to_string()))?;
        Ok(Self { client })
    }
}

#[cfg(feature = "http")]
impl HttpTransport for ReqwestTransport {
    fn post(&self, url: &str, headers: &[(String, String)], body: &str) -> Result<u16> {
        let mut request = self.client.post(url).body(body.to_string());
        for (key, value) in headers {
            request = request.header(key.as_str(), value.as_str());
        }
        let response = request
            .send()
            .map_err(|e| LogError::transport(url, e.to_string()))?;
        Ok(response.status().as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::level::Severity;
    use parking_lot::Mutex;

    /// Scripted transport recording every request.
    struct MockTransport {
        // url -> status to answer with; None = connection error
        responses: Vec<(String, Option<u16>)>,
        requests: Mutex<Vec<(String, String)>>,
    }

    impl MockTransport {
        fn new(responses: Vec<(&str, Option<u16>)>) -> Arc<Self> {
            Arc::new(Self {
                responses: responses
                    .into_iter()
                    .map(|(u, s)| (u.to_string(), s))
                    .collect(),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<(String, String)> {
            self.requests.lock().clone()
        }
    }

    impl HttpTransport for MockTransport {
        fn post(&self, url: &str, _headers: &[(String, String)], body: &str) -> Result<u16> {
            self.requests.lock().push((url.to_string(), body.to_string()));
            match self.responses.iter().find(|(u, _)| u == url) {
                Some((_, Some(status))) => Ok(*status),
                Some((_, None)) => Err(LogError::transport(url, "connection refused")),
                None => Ok(200),
            }
        }
    }

    fn event(n: usize) -> Event {
        Event::new(Severity::Info, format!("event {}", n))
    }

    fn urls() -> Vec<String> {
        vec![
            "http://a.collector/ingest".to_string(),
            "http://b.collector/ingest".to_string(),
            "http://c.collector/ingest".to_string(),
        ]
    }

    #[test]
    fn test_failover_delivers_on_last_candidate() {
        let transport = MockTransport::new(vec![
            ("http://a.collector/ingest", Some(500)),
            ("http://b.collector/ingest", Some(500)),
            ("http://c.collector/ingest", Some(200)),
        ]);
        let sink = HttpBatchSink::builder("http", transport.clone())
            .urls(urls())
            .batch_size(8)
            .delay(Duration::ZERO)
            .build()
            .expect("build sink");

        sink.write(&event(0)).expect("enqueue");
        sink.close().expect("close");

        // One request reached each endpoint, in rotation order.
        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].0, "http://a.collector/ingest");
        assert_eq!(requests[1].0, "http://b.collector/ingest");
        assert_eq!(requests[2].0, "http://c.collector/ingest");
        assert_eq!(sink.stats().write_errors(), 0);
    }

    #[test]
    fn test_all_candidates_failing_counts_batch() {
        let transport = MockTransport::new(vec![
            ("http://a.collector/ingest", None),
            ("http://b.collector/ingest", Some(503)),
            ("http://c.collector/ingest", Some(404)),
        ]);
        let sink = HttpBatchSink::builder("http", transport.clone())
            .urls(urls())
            .batch_size(16)
            .delay(Duration::ZERO)
            .build()
            .expect("build sink");

        for n in 0..7 {
            sink.write(&event(n)).expect("enqueue");
        }
        sink.close().expect("close");

        assert_eq!(sink.stats().write_errors(), 7);
        assert_eq!(sink.stats().rate_limited(), 0);
    }

    #[test]
    fn test_redirect_status_is_success() {
        let transport = MockTransport::new(vec![("http://a.collector/ingest", Some(302))]);
        let sink = HttpBatchSink::builder("http", transport.clone())
            .urls(vec!["http://a.collector/ingest".to_string()])
            .delay(Duration::ZERO)
            .build()
            .expect("build sink");

        sink.write(&event(0)).expect("enqueue");
        sink.close().expect("close");

        assert_eq!(transport.requests().len(), 1);
        assert_eq!(sink.stats().write_errors(), 0);
    }

    #[test]
    fn test_rate_limit_denial_counted_separately() {
        let transport = MockTransport::new(vec![]);
        let limiter = Arc::new(WindowLimiter::new(
            Duration::from_secs(1),
            Duration::from_secs(60),
            0,
        ));
        let sink = HttpBatchSink::builder("http", transport.clone())
            .urls(urls())
            .limiter(limiter)
            .batch_size(16)
            .delay(Duration::ZERO)
            .build()
            .expect("build sink");

        for n in 0..9 {
            sink.write(&event(n)).expect("enqueue");
        }
        sink.close().expect("close");

        // No request was attempted; the denial is not a write failure.
        assert!(transport.requests().is_empty());
        assert_eq!(sink.stats().rate_limited(), 9);
        assert_eq!(sink.stats().write_errors(), 0);
    }

    #[test]
    fn test_json_batch_body() {
        let transport = MockTransport::new(vec![]);
        let sink = HttpBatchSink::builder("http", transport.clone())
            .urls(vec!["http://a.collector/ingest".to_string()])
            .batch_format(BatchFormat::Json)
            .batch_size(8)
            .delay(Duration::ZERO)
            .build()
            .expect("build sink");

        sink.write(&event(1)).expect("enqueue");
        sink.close().expect("close");

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        let records: Vec<serde_json::Value> = requests[0]
            .1
            .lines()
            .map(|line| serde_json::from_str(line).expect("valid JSON record"))
            .collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["message"], "event 1");
        assert_eq!(records[0]["level"], "INFO");
    }

    #[test]
    fn test_cursor_rotates_across_batches() {
        let transport = MockTransport::new(vec![]);
        let sink = HttpBatchSink::builder("http", transport.clone())
            .urls(urls())
            .batch_size(1)
            .delay(Duration::ZERO)
            .build()
            .expect("build sink");

        // batch_size 1 with a single worker: one batch per event.
        for n in 0..3 {
            sink.write(&event(n)).expect("enqueue");
        }
        sink.close().expect("close");

        // Every candidate answers 200, so each batch hits exactly one
        // endpoint and the cursor walks the rotation.
        let hit: Vec<String> = transport.requests().iter().map(|(u, _)| u.clone()).collect();
        assert_eq!(
            hit,
            vec![
                "http://a.collector/ingest".to_string(),
                "http://b.collector/ingest".to_string(),
                "http://c.collector/ingest".to_string(),
            ]
        );
    }

    #[test]
    fn test_empty_url_list_rejected() {
        let transport = MockTransport::new(vec![]);
        let built = HttpBatchSink::builder("http", transport).build();
        assert!(built.is_err());
    }
}
