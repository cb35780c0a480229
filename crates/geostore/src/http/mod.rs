//! HTTP pipeline: middleware and the transport wrapper that runs it
//!
//! The client assembles the pipeline as
//!
//! ```text
//! [request id, default headers] -> RetryPolicy -> [bearer token, tracing] -> HttpTransport
//! ```

pub mod middleware;
mod pipeline;

pub use middleware::{
    BearerTokenMiddleware, CLIENT_REQUEST_ID_HEADER, DefaultHeadersMiddleware, Middleware,
    MiddlewareStack, RequestIdMiddleware, TracingMiddleware,
};
pub use pipeline::MiddlewareTransport;

// Re-export HTTP types from the http crate for convenience
pub use http::{Method, StatusCode};
