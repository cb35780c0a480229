//! HTTP transport implementation
//!
//! Provides the reqwest-backed terminal transport and the retry policy that
//! wraps it with bounded retries and primary/secondary failover.

pub mod client;
pub mod retry;

pub use client::{HttpTransport, HttpTransportConfig};
pub use retry::{RetryPolicy, classify};
