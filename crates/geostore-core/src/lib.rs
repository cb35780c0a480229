#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Core retry primitives for the geostore client.
//!
//! This crate holds the pieces of the request retry policy that do no I/O:
//!
//! - **Configuration** via [`RetryOptions`](retry::RetryOptions), validated once
//!   and shared read-only by every request
//! - **Backoff** calculation for primary and secondary attempts
//! - **Endpoint selection** between a primary host and an optional read-only
//!   secondary replica, tracked per request by
//!   [`AttemptContext`](retry::AttemptContext)
//! - **Status classification** into retry decisions
//!
//! The attempt loop that drives these lives in `geostore-transport`, next to the
//! `Transport` trait it wraps.
//!
//! # Examples
//!
//! ```rust
//! use geostore_core::prelude::*;
//! use std::time::Duration;
//!
//! let options = RetryOptions::builder()
//!     .max_tries(3)
//!     .secondary_host("myaccount-secondary.blob.core.windows.net")
//!     .build()?;
//!
//! let mut context = AttemptContext::new(true, &options);
//! assert_eq!(context.endpoint(), Endpoint::Primary);
//! assert_eq!(options.delay_for(&context, Endpoint::Primary), Duration::ZERO);
//!
//! context.advance(Endpoint::Primary, false);
//! assert_eq!(context.endpoint(), Endpoint::Secondary);
//! # Ok::<(), geostore_core::retry::InvalidConfiguration>(())
//! ```

pub mod retry;

/// Convenient re-exports of commonly used items.
///
/// ```rust
/// use geostore_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::retry::{
        AttemptContext, Classification, Endpoint, InvalidConfiguration, RetryOptions,
        RetryOptionsBuilder, RetryPolicyKind, RetrySettings, classify_status,
    };
}
