//! Centralized observability utilities for structured logging
//!
//! Every logical request sent through [`Client`](crate::Client) is logged
//! through this layer; per-attempt exchanges are logged by
//! [`TracingMiddleware`](crate::http::TracingMiddleware).

use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// HTTP request metadata for structured logging
#[derive(Debug, Clone)]
pub struct RequestMetadata {
    /// HTTP method (GET, PUT, etc.)
    pub method: String,
    /// Request path
    pub path: String,
    /// Target authority (`host[:port]`), if known
    pub host: Option<String>,
    /// Request body size in bytes (optional)
    pub body_size: Option<usize>,
}

impl RequestMetadata {
    /// Create new request metadata
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            host: None,
            body_size: None,
        }
    }

    /// Set the target host
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the request body size
    pub fn with_body_size(mut self, size: usize) -> Self {
        self.body_size = Some(size);
        self
    }

    /// Log request being sent
    pub fn log_request(&self) {
        debug!(
            method = %self.method,
            path = %self.path,
            host = self.host.as_deref(),
            body_size = self.body_size,
            "Sending HTTP request"
        );
    }
}

/// HTTP response metadata for structured logging
#[derive(Debug, Clone)]
pub struct ResponseMetadata {
    /// HTTP status code
    pub status: u16,
    /// Response body size in bytes (optional)
    pub body_size: Option<usize>,
    /// Time elapsed for the logical request, backoff included
    pub elapsed: Duration,
}

impl ResponseMetadata {
    /// Create new response metadata
    pub fn new(status: u16, elapsed: Duration) -> Self {
        Self {
            status,
            body_size: None,
            elapsed,
        }
    }

    /// Set the response body size
    pub fn with_body_size(mut self, size: usize) -> Self {
        self.body_size = Some(size);
        self
    }

    /// Log successful response
    pub fn log_success(&self, request: &RequestMetadata) {
        info!(
            method = %request.method,
            path = %request.path,
            status = self.status,
            elapsed_ms = self.elapsed.as_millis(),
            body_size = self.body_size,
            "HTTP request succeeded"
        );
    }

    /// Log failed response
    pub fn log_error(&self, request: &RequestMetadata, error: &str) {
        warn!(
            method = %request.method,
            path = %request.path,
            status = self.status,
            elapsed_ms = self.elapsed.as_millis(),
            error = %error,
            "HTTP request failed"
        );
    }
}

/// Log a logical request that ended without any response
pub fn log_transport_failure(request: &RequestMetadata, elapsed: Duration, error: &str) {
    warn!(
        method = %request.method,
        path = %request.path,
        elapsed_ms = elapsed.as_millis(),
        error = %error,
        "HTTP request failed without a response"
    );
}

/// Timer for measuring request duration
///
/// Uses the tokio clock so paused-time tests observe backoff sleeps.
pub struct RequestTimer {
    start: Instant,
}

impl RequestTimer {
    /// Start a new timer
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Install a global `tracing` subscriber filtered by `RUST_LOG`.
///
/// Defaults to `geostore=info` when `RUST_LOG` is unset. Returns `false` if a
/// global subscriber was already installed.
#[cfg(feature = "trace")]
pub fn init_tracing() -> bool {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("geostore=info,geostore_transport=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_metadata_creation() {
        let metadata = RequestMetadata::new("PUT", "/container/blob");
        assert_eq!(metadata.method, "PUT");
        assert_eq!(metadata.path, "/container/blob");
        assert_eq!(metadata.host, None);
        assert_eq!(metadata.body_size, None);
    }

    #[test]
    fn test_request_metadata_builders() {
        let metadata = RequestMetadata::new("PUT", "/container/blob")
            .with_host("acct.blob.example.net")
            .with_body_size(1024);
        assert_eq!(metadata.host.as_deref(), Some("acct.blob.example.net"));
        assert_eq!(metadata.body_size, Some(1024));
    }

    #[test]
    fn test_response_metadata_creation() {
        let elapsed = Duration::from_millis(500);
        let metadata = ResponseMetadata::new(200, elapsed).with_body_size(7);
        assert_eq!(metadata.status, 200);
        assert_eq!(metadata.elapsed, elapsed);
        assert_eq!(metadata.body_size, Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_timer_follows_tokio_clock() {
        let timer = RequestTimer::start();
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(timer.elapsed() >= Duration::from_secs(4));
    }

    #[cfg(feature = "trace")]
    #[test]
    fn test_init_tracing_installs_once() {
        init_tracing();
        assert!(!init_tracing());
    }
}
