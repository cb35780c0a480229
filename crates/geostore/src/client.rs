//! Main client implementation for geo-replicated storage endpoints

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use geostore_core::retry::RetryOptions;
use geostore_transport::{
    HttpRequest, HttpResponse, HttpTransport, HttpTransportConfig, RetryPolicy, Transport,
    TransportError,
};
use http::Method;
use url::Url;

use crate::{
    config::ClientConfig,
    error::{Error, Result},
    http::{
        BearerTokenMiddleware, DefaultHeadersMiddleware, MiddlewareStack, MiddlewareTransport,
        RequestIdMiddleware, TracingMiddleware,
    },
    observability::{self, RequestMetadata, RequestTimer, ResponseMetadata},
};

type Pipeline = MiddlewareTransport<RetryPolicy<MiddlewareTransport<Arc<dyn Transport>>>>;

/// Client for a storage account with a primary endpoint and an optional
/// read-only secondary.
///
/// Every request goes through the same pipeline: a client request id and the
/// default headers are added once, then the retry policy runs the attempts,
/// each of which is authorized and logged on its own.
///
/// # Example
///
/// ```rust,no_run
/// use geostore::{Client, ClientConfig};
///
/// # async fn run() -> geostore::Result<()> {
/// let config = ClientConfig::builder()
///     .endpoint("https://account.blob.example.net")
///     .secondary_host("account-secondary.blob.example.net")
///     .build()?;
/// let client = Client::new(config)?;
///
/// let blob = client.get("container/blob.txt").await?;
/// println!("{} bytes", blob.body.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    pipeline: Pipeline,
}

impl Client {
    /// Create a client sending over HTTP.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = HttpTransport::with_config(HttpTransportConfig {
            connect_timeout: config.connect_timeout,
            ..Default::default()
        })?;
        Ok(Self::with_transport(config, transport))
    }

    /// Create a client from environment variables.
    ///
    /// See [`ClientConfig::from_env`] for the variables read.
    #[cfg(feature = "env")]
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Create a client over a custom transport.
    ///
    /// The transport performs single exchanges; retries, failover and the
    /// middleware are layered on top of it.
    pub fn with_transport(config: ClientConfig, transport: impl Transport + 'static) -> Self {
        let transport: Arc<dyn Transport> = Arc::new(transport);

        let mut per_attempt = MiddlewareStack::new();
        if let Some(token) = &config.credential {
            per_attempt.push(Box::new(BearerTokenMiddleware::new(token.clone())));
        }
        per_attempt.push(Box::new(TracingMiddleware));

        let mut headers = config.default_headers.clone();
        if !headers.keys().any(|k| k.eq_ignore_ascii_case("user-agent")) {
            headers.insert("user-agent".to_string(), config.user_agent.clone());
        }
        let per_request = MiddlewareStack::new()
            .with(RequestIdMiddleware)
            .with(DefaultHeadersMiddleware::new(headers));

        let retry = RetryPolicy::new(
            MiddlewareTransport::new(transport, per_attempt),
            config.retry.clone(),
        );
        let pipeline = MiddlewareTransport::new(retry, per_request);

        Self {
            inner: Arc::new(ClientInner { config, pipeline }),
        }
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// The retry options applied to every request.
    pub fn retry_options(&self) -> &RetryOptions {
        &self.inner.config.retry
    }

    /// Resolve `path` against the endpoint.
    ///
    /// The path is appended to the endpoint's own path; a query string after
    /// `?` is kept.
    pub fn url(&self, path: &str) -> Url {
        let (path, query) = match path.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (path, None),
        };

        let mut url = self.inner.config.endpoint.clone();
        let joined = format!(
            "{}/{}",
            url.path().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        url.set_path(&joined);
        if query.is_some() {
            url.set_query(query);
        }
        url
    }

    /// Build a request for `path` without sending it.
    pub fn request(&self, method: Method, path: &str) -> HttpRequest {
        HttpRequest::new(method, self.url(path))
    }

    /// Send a request through the pipeline and return the final response,
    /// whatever its status.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] when no response was obtained.
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let metadata = RequestMetadata::new(request.method.as_str(), request.url.path());
        let timer = RequestTimer::start();

        match self.inner.pipeline.send(request).await {
            Ok(response) => {
                let outcome = ResponseMetadata::new(response.status, timer.elapsed())
                    .with_body_size(response.body.len());
                if response.is_success() {
                    outcome.log_success(&metadata);
                } else {
                    outcome.log_error(&metadata, &format!("HTTP {}", response.status));
                }
                Ok(response)
            }
            Err(err) => {
                observability::log_transport_failure(&metadata, timer.elapsed(), &err.to_string());
                Err(err.into())
            }
        }
    }

    /// Send a request, abandoning it as soon as `cancel` completes.
    ///
    /// No further attempt starts after cancellation and the in-flight
    /// exchange, if any, is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Cancelled`] (wrapped in [`Error::Transport`])
    /// when `cancel` wins.
    pub async fn send_with_cancel<C>(&self, request: HttpRequest, cancel: C) -> Result<HttpResponse>
    where
        C: Future<Output = ()> + Send,
    {
        let method = request.method.clone();
        let path = request.url.path().to_string();
        tokio::select! {
            biased;
            _ = cancel => {
                tracing::debug!(method = %method, path = %path, "Request cancelled by caller");
                Err(Error::Transport(TransportError::Cancelled))
            }
            result = self.send(request) => result,
        }
    }

    /// Read a blob.
    pub async fn get(&self, path: &str) -> Result<HttpResponse> {
        self.checked(self.request(Method::GET, path)).await
    }

    /// Read a blob's properties.
    pub async fn head(&self, path: &str) -> Result<HttpResponse> {
        self.checked(self.request(Method::HEAD, path)).await
    }

    /// Write a blob. The same bytes are sent on every attempt.
    pub async fn put(&self, path: &str, body: impl Into<Bytes>) -> Result<HttpResponse> {
        self.checked(self.request(Method::PUT, path).with_body(body))
            .await
    }

    /// Delete a blob.
    pub async fn delete(&self, path: &str) -> Result<HttpResponse> {
        self.checked(self.request(Method::DELETE, path)).await
    }

    async fn checked(&self, request: HttpRequest) -> Result<HttpResponse> {
        let response = self.send(request).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(Error::from_response(&response))
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.inner.config.endpoint.as_str())
            .field("retry", &self.inner.config.retry)
            .finish()
    }
}
