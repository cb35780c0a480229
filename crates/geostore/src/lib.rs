//! # geostore
//!
//! Async Rust client for geo-replicated blob storage supporting:
//! - Retries with exponential or fixed backoff and a per-attempt timeout
//! - Read failover to a read-only secondary host (GET/HEAD only)
//! - Request ids, default headers and bearer tokens through middleware
//! - Configuration from code, environment variables or TOML
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use geostore::{Client, ClientConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::builder()
//!         .endpoint("https://account.blob.example.net")
//!         .secondary_host("account-secondary.blob.example.net")
//!         .max_tries(4)
//!         .try_timeout(Duration::from_secs(30))
//!         .build()?;
//!     let client = Client::new(config)?;
//!
//!     client.put("container/hello.txt", "Hello, world!").await?;
//!     let blob = client.get("container/hello.txt").await?;
//!     println!("{}", blob.text()?);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Re-export commonly used types
pub use client::Client;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{Error, Result};

// Module declarations
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod observability;

// Re-export the layers the client is built from
pub use geostore_core::retry::{
    Endpoint, InvalidConfiguration, RetryOptions, RetryOptionsBuilder, RetryPolicyKind,
    RetrySettings,
};
pub use geostore_transport::{
    HttpRequest, HttpResponse, HttpTransport, RetryPolicy, Transport, TransportError,
};

// Re-export key dependencies for convenience
pub use async_trait::async_trait;
pub use bytes::Bytes;

/// Version of the geostore crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Client, ClientConfig, Error, HttpRequest, HttpResponse, Result, RetryOptions,
        RetryPolicyKind, Transport,
    };
}
