//! Test utilities for depwatch.
//!
//! Available to unit tests and, through the `test-utils` feature, to the
//! integration tests under `tests/`.
//!
//! - [`init_test_logging`] - one-time tracing setup
//! - [`ScriptedTransport`] - in-memory [`Transport`] that counts calls and
//!   tracks how many requests were in flight at once
//! - [`MemoryReporter`] - [`Reporter`] that collects everything it is given

use crate::core::DepwatchError;
use crate::enrich::Verdict;
use crate::http::{HttpRequest, HttpResponse, Transport, TransportError};
use crate::report::{Reporter, format_line};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, Once};
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, otherwise `RUST_LOG`; with neither, logging stays
/// off. Safe to call from every test.
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

/// In-memory transport answering from a URL table.
///
/// Unknown URLs get a `404`. Every call is counted, per URL and in total, and
/// the peak number of concurrently executing calls is recorded. An optional
/// delay keeps calls in flight long enough to overlap.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, HttpResponse>>,
    delay: Option<Duration>,
    calls: Mutex<HashMap<String, usize>>,
    total: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every call for `delay` before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Answer `url` with `response`.
    #[must_use]
    pub fn route(self, url: impl Into<String>, response: HttpResponse) -> Self {
        self.set_route(url, response);
        self
    }

    /// Answer `url` with a `200` JSON body.
    #[must_use]
    pub fn json(self, url: impl Into<String>, body: &serde_json::Value) -> Self {
        self.route(url, HttpResponse::ok(body.to_string().into_bytes()))
    }

    /// Replace the answer for `url`.
    pub fn set_route(&self, url: impl Into<String>, response: HttpResponse) {
        if let Ok(mut routes) = self.routes.lock() {
            routes.insert(url.into(), response);
        }
    }

    /// Calls made for `url`.
    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().map(|c| c.get(url).copied().unwrap_or(0)).unwrap_or(0)
    }

    /// Calls made in total.
    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    /// Highest number of calls that were executing at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);
        self.total.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut calls) = self.calls.lock() {
            *calls.entry(request.url.clone()).or_default() += 1;
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let response = self
            .routes
            .lock()
            .ok()
            .and_then(|routes| routes.get(&request.url).cloned())
            .unwrap_or_else(|| HttpResponse::new(StatusCode::NOT_FOUND));

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(response)
    }
}

/// A reported manifest-level failure.
#[derive(Debug, Clone)]
pub struct ManifestFailure {
    pub path: PathBuf,
    pub message: String,
}

/// Reporter that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    manifests: Mutex<Vec<PathBuf>>,
    failures: Mutex<Vec<ManifestFailure>>,
    findings: Mutex<Vec<(PathBuf, Verdict)>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn manifests(&self) -> Vec<PathBuf> {
        self.manifests.lock().map(|m| m.clone()).unwrap_or_default()
    }

    pub fn failures(&self) -> Vec<ManifestFailure> {
        self.failures.lock().map(|f| f.clone()).unwrap_or_default()
    }

    pub fn findings(&self) -> Vec<(PathBuf, Verdict)> {
        self.findings.lock().map(|f| f.clone()).unwrap_or_default()
    }

    /// Uncolored report lines, sorted so assertions do not depend on
    /// completion order.
    pub fn sorted_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> =
            self.findings().iter().map(|(path, verdict)| format_line(path, verdict, false)).collect();
        lines.sort();
        lines
    }
}

impl Reporter for MemoryReporter {
    fn manifest(&self, path: &Path) {
        if let Ok(mut manifests) = self.manifests.lock() {
            manifests.push(path.to_path_buf());
        }
    }

    fn manifest_error(&self, path: &Path, error: &DepwatchError) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.push(ManifestFailure {
                path: path.to_path_buf(),
                message: error.to_string(),
            });
        }
    }

    fn finding(&self, manifest: &Path, verdict: &Verdict) {
        if let Ok(mut findings) = self.findings.lock() {
            findings.push((manifest.to_path_buf(), verdict.clone()));
        }
    }
}
