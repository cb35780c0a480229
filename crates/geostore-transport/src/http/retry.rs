//! Retry policy with primary/secondary failover
//!
//! [`RetryPolicy`] wraps a downstream [`Transport`] and drives each logical
//! request through an explicit attempt loop:
//!
//! ```text
//! Idle -> Attempting -> Evaluating -> Idle (retry)
//!                                  -> Done (success, final error, budget spent)
//! ```
//!
//! The per-request counters live in an [`AttemptContext`] created by each call,
//! so one policy can serve any number of concurrent requests.

use crate::error::{Result, TransportError};
use crate::traits::{HttpRequest, HttpResponse, Transport};
use async_trait::async_trait;
use geostore_core::retry::{AttemptContext, Classification, Endpoint, RetryOptions, classify_status};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Classify the outcome of one attempt against `endpoint`.
///
/// # Retry Logic
///
/// Retryable:
/// - Timeout, connection and I/O failures
/// - HTTP 500 and 503
/// - HTTP 404 from the secondary host (also disables secondary)
///
/// Final:
/// - Any other response status, returned to the caller as is
/// - Any other transport error (invalid URL, protocol error, cancellation)
pub fn classify(outcome: &Result<HttpResponse>, endpoint: Endpoint) -> Classification {
    match outcome {
        Ok(response) => classify_status(response.status, endpoint),
        Err(err) if err.is_transient() => Classification::Retryable,
        Err(_) => Classification::NonRetryable,
    }
}

#[derive(Debug)]
enum AttemptState {
    Idle,
    Attempting(Endpoint),
    Evaluating(Endpoint, Result<HttpResponse>),
    Done(Result<HttpResponse>),
}

/// Transport stage that retries failed attempts and fails reads over to a
/// secondary host.
///
/// The policy is transparent: it returns the same outcome shape as the
/// downstream transport, and the final outcome is the last attempt's outcome
/// unchanged. Exhausting `max_tries` does not produce a new error.
///
/// # Examples
///
/// ```rust
/// use geostore_core::retry::RetryOptions;
/// use geostore_transport::{HttpTransport, RetryPolicy};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let options = RetryOptions::builder().max_tries(3).build()?;
/// let policy = RetryPolicy::new(HttpTransport::new()?, options);
/// assert_eq!(policy.options().max_tries(), 3);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy<T> {
    inner: T,
    options: Arc<RetryOptions>,
}

impl<T: Transport> RetryPolicy<T> {
    /// Wrap `inner` with the given retry options.
    pub fn new(inner: T, options: RetryOptions) -> Self {
        Self::with_shared_options(inner, Arc::new(options))
    }

    /// Wrap `inner` with options shared with other policies.
    pub fn with_shared_options(inner: T, options: Arc<RetryOptions>) -> Self {
        Self { inner, options }
    }

    /// The retry options in effect.
    pub fn options(&self) -> &RetryOptions {
        &self.options
    }

    /// The downstream transport.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Send `request`, giving up early when `cancel` completes.
    ///
    /// Cancellation drops any pending backoff sleep and the in-flight attempt,
    /// issues no further attempts, and returns [`TransportError::Cancelled`].
    /// Dropping the future returned by [`Transport::send`] has the same effect
    /// without producing an outcome.
    pub async fn send_with_cancel<C>(&self, request: HttpRequest, cancel: C) -> Result<HttpResponse>
    where
        C: Future<Output = ()> + Send,
    {
        tokio::select! {
            biased;
            _ = cancel => {
                debug!(target: "geostore::retry", url = %request_target(&request), "request cancelled");
                Err(TransportError::Cancelled)
            }
            outcome = self.run(&request) => outcome,
        }
    }

    async fn run(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let mut context = AttemptContext::new(request.is_read_only(), &self.options);
        let mut state = AttemptState::Idle;

        loop {
            state = match state {
                AttemptState::Idle => {
                    let endpoint = context.endpoint();
                    let delay = self.options.delay_for(&context, endpoint);
                    debug!(
                        target: "geostore::retry",
                        attempt = context.attempt(),
                        primary_try = context.primary_try(),
                        endpoint = %endpoint,
                        delay_ms = delay_millis(delay),
                        "sending attempt"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    AttemptState::Attempting(endpoint)
                }
                AttemptState::Attempting(endpoint) => {
                    let outcome = self.attempt(request, endpoint).await;
                    AttemptState::Evaluating(endpoint, outcome)
                }
                AttemptState::Evaluating(endpoint, outcome) => {
                    let classification = classify(&outcome, endpoint);
                    let exhausted = context.is_exhausted(self.options.max_tries());
                    trace!(
                        target: "geostore::retry",
                        attempt = context.attempt(),
                        endpoint = %endpoint,
                        ?classification,
                        exhausted,
                        "attempt evaluated"
                    );

                    if classification.should_retry() && !exhausted {
                        context.advance(endpoint, classification.disables_secondary());
                        AttemptState::Idle
                    } else {
                        AttemptState::Done(outcome)
                    }
                }
                AttemptState::Done(outcome) => return outcome,
            };
        }
    }

    /// One physical attempt on a fresh copy of `request`, bounded by `try_timeout`.
    async fn attempt(&self, request: &HttpRequest, endpoint: Endpoint) -> Result<HttpResponse> {
        let copy = match (endpoint, self.options.secondary_host()) {
            (Endpoint::Secondary, Some(host)) => request.with_host(host)?,
            _ => request.clone(),
        };

        match tokio::time::timeout(self.options.try_timeout(), self.inner.send(copy)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(TransportError::Timeout),
        }
    }
}

#[async_trait]
impl<T: Transport> Transport for RetryPolicy<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.run(&request).await
    }
}

/// Whole milliseconds in `delay`, saturating for the unclamped exponential tail.
fn delay_millis(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}

fn request_target(request: &HttpRequest) -> String {
    format!("{} {}", request.method, request.url)
}
