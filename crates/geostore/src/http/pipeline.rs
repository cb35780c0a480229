//! Transport wrapper that runs a middleware stack around each exchange

use super::middleware::{Middleware, MiddlewareStack};
use async_trait::async_trait;
use geostore_transport::{HttpRequest, HttpResponse, Result, Transport};
use std::sync::Arc;

/// A [`Transport`] that passes each request through a [`MiddlewareStack`]
/// before handing it to `inner`, and each response back through the stack.
///
/// Wrapped around a `RetryPolicy` the stack runs once per logical request;
/// wrapped inside one it runs once per attempt.
#[derive(Debug, Clone)]
pub struct MiddlewareTransport<T> {
    inner: T,
    stack: Arc<MiddlewareStack>,
}

impl<T> MiddlewareTransport<T> {
    /// Wrap `inner` with `stack`.
    pub fn new(inner: T, stack: MiddlewareStack) -> Self {
        Self {
            inner,
            stack: Arc::new(stack),
        }
    }

    /// The wrapped transport.
    pub fn inner(&self) -> &T {
        &self.inner
    }
}

#[async_trait]
impl<T: Transport> Transport for MiddlewareTransport<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let request = self.stack.process_request(request).await?;
        match self.inner.send(request).await {
            Ok(response) => self.stack.process_response(response).await,
            Err(err) => {
                self.stack.on_error(&err);
                Err(err)
            }
        }
    }
}
