//! Retry configuration, backoff and endpoint failover.
//!
//! # Key Types
//!
//! - [`RetryOptions`] - validated, immutable retry parameters
//! - [`RetryPolicyKind`] - exponential or fixed backoff
//! - [`AttemptContext`] - per-request attempt counters and secondary eligibility
//! - [`Classification`] - what to do after an attempt completes
//!
//! # Examples
//!
//! ```rust
//! use geostore_core::retry::{RetryPolicyKind, RetryOptions};
//! use std::time::Duration;
//!
//! let options = RetryOptions::builder()
//!     .policy_kind(RetryPolicyKind::Fixed)
//!     .retry_delay(Duration::from_secs(2))
//!     .max_retry_delay(Duration::from_secs(10))
//!     .build()?;
//!
//! assert_eq!(options.retry_delay(), Duration::from_secs(2));
//! # Ok::<(), geostore_core::retry::InvalidConfiguration>(())
//! ```

mod backoff;
mod classify;
mod endpoint;
mod options;

pub use backoff::{SECONDARY_BASE_DELAY, secondary_delay, secondary_delay_from};
pub use classify::{Classification, classify_status};
pub use endpoint::{AttemptContext, Endpoint};
pub use options::{
    InvalidConfiguration, RetryOptions, RetryOptionsBuilder, RetryPolicyKind, RetrySettings,
};
