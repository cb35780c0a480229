//! Transport abstraction and retry policy for geostore
//!
//! Every stage of the request pipeline speaks the same [`Transport`] interface:
//! `send(request) -> outcome`. The [`RetryPolicy`] wraps any downstream
//! transport and is itself a transport, so callers cannot tell how many
//! attempts a request took.

#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! # Architecture
//!
//! - **Transport trait**: the `send` seam shared by every pipeline stage
//! - **HTTP transport**: the terminal stage, backed by reqwest
//! - **Retry policy**: bounded retries with primary/secondary failover
//! - **Error handling**: one [`TransportError`] for every stage
//!
//! # Usage
//!
//! ```no_run
//! use geostore_core::retry::RetryOptions;
//! use geostore_transport::{HttpRequest, HttpTransport, RetryPolicy, Transport};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let options = RetryOptions::builder()
//!     .secondary_host("myaccount-secondary.blob.core.windows.net")
//!     .build()?;
//! let policy = RetryPolicy::new(HttpTransport::new()?, options);
//!
//! let request = HttpRequest::parse(
//!     http::Method::GET,
//!     "https://myaccount.blob.core.windows.net/container/blob",
//! )?;
//! let response = policy.send(request).await?;
//! println!("status {}", response.status);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod http;
pub mod traits;

// Re-export commonly used types
pub use error::{Result, TransportError};
pub use crate::http::{HttpTransport, HttpTransportConfig, RetryPolicy};
pub use traits::{HttpRequest, HttpResponse, Transport};
