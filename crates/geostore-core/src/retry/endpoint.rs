//! Primary/secondary endpoint selection and per-request attempt counters.

use super::options::RetryOptions;
use std::fmt;

/// Which host an attempt is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// The account's primary host, taken from the request URL.
    Primary,
    /// The configured read-only secondary replica.
    Secondary,
}

impl Endpoint {
    /// Whether this is the primary endpoint.
    pub fn is_primary(self) -> bool {
        matches!(self, Endpoint::Primary)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Primary => f.write_str("primary"),
            Endpoint::Secondary => f.write_str("secondary"),
        }
    }
}

/// Attempt counters for one logical request.
///
/// Created at the start of a send and dropped when it returns. Nothing here
/// is shared between requests.
///
/// ```rust
/// use geostore_core::retry::{AttemptContext, Endpoint, RetryOptions};
///
/// let options = RetryOptions::builder().secondary_host("replica").build()?;
/// let mut context = AttemptContext::new(true, &options);
///
/// assert_eq!(context.endpoint(), Endpoint::Primary);
/// context.advance(Endpoint::Primary, false);
/// assert_eq!(context.endpoint(), Endpoint::Secondary);
///
/// // a 404 from the secondary disables it for good
/// context.advance(Endpoint::Secondary, true);
/// assert_eq!(context.endpoint(), Endpoint::Primary);
/// assert!(!context.secondary_eligible());
/// # Ok::<(), geostore_core::retry::InvalidConfiguration>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptContext {
    attempt: u32,
    primary_try: u32,
    secondary_eligible: bool,
}

impl AttemptContext {
    /// Start a context for a request.
    ///
    /// Secondary is eligible only for read-only methods (GET/HEAD) when a
    /// secondary host is configured.
    pub fn new(read_only: bool, options: &RetryOptions) -> Self {
        Self {
            attempt: 1,
            primary_try: 1,
            secondary_eligible: read_only && options.secondary_host().is_some(),
        }
    }

    /// 1-based number of the current attempt.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// 1-based backoff counter for primary attempts.
    pub fn primary_try(&self) -> u32 {
        self.primary_try
    }

    /// Whether the secondary host may still be tried.
    pub fn secondary_eligible(&self) -> bool {
        self.secondary_eligible
    }

    /// Endpoint for the current attempt.
    ///
    /// Odd attempts go to primary and even attempts to secondary while the
    /// secondary is eligible; otherwise always primary.
    pub fn endpoint(&self) -> Endpoint {
        if self.secondary_eligible && self.attempt % 2 == 0 {
            Endpoint::Secondary
        } else {
            Endpoint::Primary
        }
    }

    /// Whether the attempt budget in `max_tries` is spent.
    pub fn is_exhausted(&self, max_tries: u32) -> bool {
        self.attempt >= max_tries
    }

    /// Move to the next attempt after trying `tried`.
    ///
    /// The primary try count grows when the attempt just made was against
    /// secondary, or when secondary was not being considered at all. A
    /// primary attempt followed by a secondary one keeps the same count, so
    /// the pair shares one backoff step.
    pub fn advance(&mut self, tried: Endpoint, disable_secondary: bool) {
        if !tried.is_primary() || !self.secondary_eligible {
            self.primary_try = self.primary_try.saturating_add(1);
        }
        if disable_secondary {
            self.secondary_eligible = false;
        }
        self.attempt = self.attempt.saturating_add(1);
    }
}
