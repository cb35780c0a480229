//! HTTP middleware for request/response processing

use crate::observability::RequestMetadata;
use async_trait::async_trait;
use geostore_transport::{HttpRequest, HttpResponse, TransportError};
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use uuid::Uuid;

/// Header carrying the client-generated request id.
pub const CLIENT_REQUEST_ID_HEADER: &str = "x-ms-client-request-id";

/// Trait for HTTP middleware.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Process a request before sending.
    async fn process_request(&self, request: HttpRequest) -> Result<HttpRequest, TransportError> {
        Ok(request)
    }

    /// Process a response after receiving.
    async fn process_response(
        &self,
        response: HttpResponse,
    ) -> Result<HttpResponse, TransportError> {
        Ok(response)
    }

    /// Observe a failed exchange. The error is passed on unchanged.
    fn on_error(&self, _error: &TransportError) {}
}

/// Middleware that adds logging/tracing.
pub struct TracingMiddleware;

#[async_trait]
impl Middleware for TracingMiddleware {
    async fn process_request(&self, request: HttpRequest) -> Result<HttpRequest, TransportError> {
        let mut metadata = RequestMetadata::new(request.method.as_str(), request.url.path())
            .with_host(request.authority());
        if let Some(body) = &request.body {
            metadata = metadata.with_body_size(body.len());
        }
        metadata.log_request();
        Ok(request)
    }

    async fn process_response(
        &self,
        response: HttpResponse,
    ) -> Result<HttpResponse, TransportError> {
        tracing::debug!(
            status = response.status,
            body_size = response.body.len(),
            "Received HTTP response"
        );
        Ok(response)
    }

    fn on_error(&self, error: &TransportError) {
        tracing::debug!(error = %error, transient = error.is_transient(), "HTTP exchange failed");
    }
}

/// Middleware that stamps one client request id on a logical request.
///
/// Placed upstream of the retry policy, every attempt of the same request
/// carries the same id. An id already present on the request is kept.
#[derive(Debug, Default)]
pub struct RequestIdMiddleware;

#[async_trait]
impl Middleware for RequestIdMiddleware {
    async fn process_request(&self, request: HttpRequest) -> Result<HttpRequest, TransportError> {
        if request.get_header(CLIENT_REQUEST_ID_HEADER).is_some() {
            return Ok(request);
        }
        Ok(request.with_header(CLIENT_REQUEST_ID_HEADER, Uuid::new_v4().to_string()))
    }
}

/// Middleware that adds configured headers without overriding the caller's.
#[derive(Debug, Clone, Default)]
pub struct DefaultHeadersMiddleware {
    headers: HashMap<String, String>,
}

impl DefaultHeadersMiddleware {
    /// Create a middleware adding `headers` to every request.
    pub fn new(headers: HashMap<String, String>) -> Self {
        Self { headers }
    }
}

#[async_trait]
impl Middleware for DefaultHeadersMiddleware {
    async fn process_request(
        &self,
        mut request: HttpRequest,
    ) -> Result<HttpRequest, TransportError> {
        for (name, value) in &self.headers {
            if request.get_header(name).is_none() {
                request.headers.insert(name.clone(), value.clone());
            }
        }
        Ok(request)
    }
}

/// Middleware that authorizes each attempt with a bearer token.
pub struct BearerTokenMiddleware {
    token: SecretString,
}

impl BearerTokenMiddleware {
    /// Create a middleware sending `token` as `Authorization: Bearer`.
    pub fn new(token: SecretString) -> Self {
        Self { token }
    }
}

impl std::fmt::Debug for BearerTokenMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerTokenMiddleware")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl Middleware for BearerTokenMiddleware {
    async fn process_request(
        &self,
        mut request: HttpRequest,
    ) -> Result<HttpRequest, TransportError> {
        request
            .headers
            .retain(|name, _| !name.eq_ignore_ascii_case("authorization"));
        Ok(request.with_header(
            "authorization",
            format!("Bearer {}", self.token.expose_secret()),
        ))
    }
}

/// Composite middleware that chains multiple middleware.
#[derive(Default)]
pub struct MiddlewareStack {
    middlewares: Vec<Box<dyn Middleware>>,
}

impl MiddlewareStack {
    /// Create a new middleware stack.
    pub fn new() -> Self {
        Self {
            middlewares: Vec::new(),
        }
    }

    /// Add a middleware to the stack.
    pub fn push(&mut self, middleware: Box<dyn Middleware>) {
        self.middlewares.push(middleware);
    }

    /// Add a middleware, builder style.
    pub fn with(mut self, middleware: impl Middleware + 'static) -> Self {
        self.push(Box::new(middleware));
        self
    }

    /// Number of middleware in the stack.
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Whether the stack is empty.
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }
}

impl std::fmt::Debug for MiddlewareStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareStack")
            .field("len", &self.middlewares.len())
            .finish()
    }
}

#[async_trait]
impl Middleware for MiddlewareStack {
    async fn process_request(
        &self,
        mut request: HttpRequest,
    ) -> Result<HttpRequest, TransportError> {
        for middleware in &self.middlewares {
            request = middleware.process_request(request).await?;
        }
        Ok(request)
    }

    async fn process_response(
        &self,
        mut response: HttpResponse,
    ) -> Result<HttpResponse, TransportError> {
        // Process in reverse order for responses
        for middleware in self.middlewares.iter().rev() {
            response = middleware.process_response(response).await?;
        }
        Ok(response)
    }

    fn on_error(&self, error: &TransportError) {
        for middleware in self.middlewares.iter().rev() {
            middleware.on_error(error);
        }
    }
}
