//! Validated retry parameters and the configuration surface that produces them.

use super::backoff::secondary_delay;
use super::endpoint::{AttemptContext, Endpoint};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Default number of attempts, including the first.
pub const DEFAULT_MAX_TRIES: u32 = 4;

/// Default time allowed for a single attempt.
pub const DEFAULT_TRY_TIMEOUT: Duration = Duration::from_secs(30);

/// Default base delay for exponential backoff.
pub const DEFAULT_EXPONENTIAL_DELAY: Duration = Duration::from_secs(4);

/// Default delay for fixed backoff.
pub const DEFAULT_FIXED_DELAY: Duration = Duration::from_secs(30);

/// Default upper bound on the retry delay.
pub const DEFAULT_MAX_RETRY_DELAY: Duration = Duration::from_secs(120);

/// Errors raised while validating retry options.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidConfiguration {
    /// `max_tries` must allow at least one attempt.
    #[error("max_tries must be at least 1, got {0}")]
    MaxTries(u32),

    /// `try_timeout` must be at least one second.
    #[error("try_timeout must be at least 1s, got {0:?}")]
    TryTimeout(Duration),

    /// Only one of `retry_delay` / `max_retry_delay` was supplied.
    #[error("retry_delay and max_retry_delay must both be set or both be unset")]
    UnpairedDelay,

    /// `retry_delay` is zero or larger than `max_retry_delay`.
    #[error("retry_delay {retry_delay:?} must be between 1ms and max_retry_delay {max_retry_delay:?}")]
    DelayOutOfRange {
        /// Supplied base delay
        retry_delay: Duration,
        /// Supplied maximum delay
        max_retry_delay: Duration,
    },

    /// The policy kind string was not recognized.
    #[error("unknown retry policy kind: {0}")]
    UnknownPolicyKind(String),

    /// `secondary_host` is not a bare `host` or `host:port` authority.
    #[error("secondary_host must be a host or host:port without scheme or path, got {0:?}")]
    SecondaryHost(String),
}

/// How the delay before a primary attempt grows with the primary try count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetryPolicyKind {
    /// `(2^(try-1) - 1) * retry_delay`
    #[default]
    #[serde(alias = "exponential", alias = "EXPONENTIAL")]
    Exponential,
    /// `retry_delay` for every retry
    #[serde(alias = "fixed", alias = "FIXED")]
    Fixed,
}

impl RetryPolicyKind {
    fn default_retry_delay(self) -> Duration {
        match self {
            RetryPolicyKind::Exponential => DEFAULT_EXPONENTIAL_DELAY,
            RetryPolicyKind::Fixed => DEFAULT_FIXED_DELAY,
        }
    }
}

impl fmt::Display for RetryPolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryPolicyKind::Exponential => f.write_str("exponential"),
            RetryPolicyKind::Fixed => f.write_str("fixed"),
        }
    }
}

impl FromStr for RetryPolicyKind {
    type Err = InvalidConfiguration;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exponential" => Ok(RetryPolicyKind::Exponential),
            "fixed" => Ok(RetryPolicyKind::Fixed),
            _ => Err(InvalidConfiguration::UnknownPolicyKind(s.to_string())),
        }
    }
}

/// Immutable retry parameters shared by every request sent through a policy.
///
/// Build with [`RetryOptions::builder`]; unset values resolve to defaults and
/// inconsistent values are rejected with [`InvalidConfiguration`].
///
/// # Default Configuration
///
/// - `policy_kind`: Exponential
/// - `max_tries`: 4
/// - `try_timeout`: 30s
/// - `retry_delay`: 4s (30s for Fixed)
/// - `max_retry_delay`: 120s
/// - `secondary_host`: none
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryOptions {
    policy_kind: RetryPolicyKind,
    max_tries: u32,
    try_timeout: Duration,
    retry_delay: Duration,
    max_retry_delay: Duration,
    secondary_host: Option<String>,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            policy_kind: RetryPolicyKind::Exponential,
            max_tries: DEFAULT_MAX_TRIES,
            try_timeout: DEFAULT_TRY_TIMEOUT,
            retry_delay: DEFAULT_EXPONENTIAL_DELAY,
            max_retry_delay: DEFAULT_MAX_RETRY_DELAY,
            secondary_host: None,
        }
    }
}

impl RetryOptions {
    /// Create a new builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use geostore_core::retry::RetryOptions;
    ///
    /// let options = RetryOptions::builder().max_tries(6).build()?;
    /// assert_eq!(options.max_tries(), 6);
    /// # Ok::<(), geostore_core::retry::InvalidConfiguration>(())
    /// ```
    pub fn builder() -> RetryOptionsBuilder {
        RetryOptionsBuilder::default()
    }

    /// Backoff kind used for primary attempts.
    pub fn policy_kind(&self) -> RetryPolicyKind {
        self.policy_kind
    }

    /// Total attempts allowed, including the first.
    pub fn max_tries(&self) -> u32 {
        self.max_tries
    }

    /// Deadline for a single attempt.
    pub fn try_timeout(&self) -> Duration {
        self.try_timeout
    }

    /// Base backoff delay.
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Configured maximum delay.
    ///
    /// This is validated against `retry_delay` but not applied to the
    /// exponential result; see [`RetryPolicyKind::primary_delay`].
    pub fn max_retry_delay(&self) -> Duration {
        self.max_retry_delay
    }

    /// Read-only replica host, if failover is configured.
    pub fn secondary_host(&self) -> Option<&str> {
        self.secondary_host.as_deref()
    }

    /// Delay to wait before the attempt described by `context` against `endpoint`.
    ///
    /// Primary attempts back off by the primary try count. Secondary attempts
    /// wait a short jittered interval regardless of the policy kind.
    pub fn delay_for(&self, context: &AttemptContext, endpoint: Endpoint) -> Duration {
        match endpoint {
            Endpoint::Primary => self
                .policy_kind
                .primary_delay(self.retry_delay, context.primary_try()),
            Endpoint::Secondary => secondary_delay(),
        }
    }
}

/// Builder for [`RetryOptions`].
#[derive(Debug, Default, Clone)]
pub struct RetryOptionsBuilder {
    policy_kind: Option<RetryPolicyKind>,
    max_tries: Option<u32>,
    try_timeout: Option<Duration>,
    retry_delay: Option<Duration>,
    max_retry_delay: Option<Duration>,
    secondary_host: Option<String>,
}

impl RetryOptionsBuilder {
    /// Set the backoff kind.
    ///
    /// Default: Exponential
    pub fn policy_kind(mut self, kind: RetryPolicyKind) -> Self {
        self.policy_kind = Some(kind);
        self
    }

    /// Set the total number of attempts, including the first.
    ///
    /// Default: 4
    pub fn max_tries(mut self, max_tries: u32) -> Self {
        self.max_tries = Some(max_tries);
        self
    }

    /// Set the deadline for a single attempt.
    ///
    /// Default: 30s
    pub fn try_timeout(mut self, timeout: Duration) -> Self {
        self.try_timeout = Some(timeout);
        self
    }

    /// Set the base backoff delay. Requires [`max_retry_delay`](Self::max_retry_delay).
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    /// Set the maximum backoff delay. Requires [`retry_delay`](Self::retry_delay).
    pub fn max_retry_delay(mut self, delay: Duration) -> Self {
        self.max_retry_delay = Some(delay);
        self
    }

    /// Set the read-only secondary host used for GET/HEAD failover.
    pub fn secondary_host(mut self, host: impl Into<String>) -> Self {
        self.secondary_host = Some(host.into());
        self
    }

    /// Validate and build the options.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidConfiguration`] if `max_tries` is 0, `try_timeout` is
    /// under a second, or the delay pair is incomplete or inconsistent.
    pub fn build(self) -> Result<RetryOptions, InvalidConfiguration> {
        let policy_kind = self.policy_kind.unwrap_or_default();

        let max_tries = self.max_tries.unwrap_or(DEFAULT_MAX_TRIES);
        if max_tries < 1 {
            return Err(InvalidConfiguration::MaxTries(max_tries));
        }

        let try_timeout = self.try_timeout.unwrap_or(DEFAULT_TRY_TIMEOUT);
        if try_timeout < Duration::from_secs(1) {
            return Err(InvalidConfiguration::TryTimeout(try_timeout));
        }

        let (retry_delay, max_retry_delay) = match (self.retry_delay, self.max_retry_delay) {
            (None, None) => (policy_kind.default_retry_delay(), DEFAULT_MAX_RETRY_DELAY),
            (Some(retry_delay), Some(max_retry_delay)) => {
                if retry_delay.is_zero() || retry_delay > max_retry_delay {
                    return Err(InvalidConfiguration::DelayOutOfRange {
                        retry_delay,
                        max_retry_delay,
                    });
                }
                (retry_delay, max_retry_delay)
            }
            _ => return Err(InvalidConfiguration::UnpairedDelay),
        };

        let secondary_host = match self.secondary_host.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(host) if is_authority(host) => Some(host.to_string()),
            Some(host) => return Err(InvalidConfiguration::SecondaryHost(host.to_string())),
        };

        Ok(RetryOptions {
            policy_kind,
            max_tries,
            try_timeout,
            retry_delay,
            max_retry_delay,
            secondary_host,
        })
    }
}

/// Whether `host` is a bare `host` or `host:port` with nothing else around it.
fn is_authority(host: &str) -> bool {
    if host.contains(['/', '\\', '?', '#', '@']) {
        return false;
    }
    match Url::parse(&format!("http://{host}")) {
        Ok(url) => url.host_str().is_some_and(|h| !h.is_empty()),
        Err(_) => false,
    }
}

/// Serializable form of the retry options, as read from configuration files.
///
/// Field names and units follow the external configuration surface:
/// `tryTimeout` is in seconds, `retryDelay` and `maxRetryDelay` in milliseconds.
///
/// ```rust
/// use geostore_core::retry::RetrySettings;
///
/// let settings: RetrySettings = serde_json::from_str(
///     r#"{"policyKind": "Fixed", "maxTries": 2, "retryDelay": 500, "maxRetryDelay": 1000}"#,
/// )?;
/// let options = settings.into_options()?;
/// assert_eq!(options.max_tries(), 2);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RetrySettings {
    /// Backoff kind
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_kind: Option<RetryPolicyKind>,
    /// Total attempts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tries: Option<u32>,
    /// Per-attempt timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub try_timeout: Option<u64>,
    /// Base delay in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_delay: Option<u64>,
    /// Maximum delay in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retry_delay: Option<u64>,
    /// Secondary host name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_host: Option<String>,
}

impl RetrySettings {
    /// Validate these settings into [`RetryOptions`].
    pub fn into_options(self) -> Result<RetryOptions, InvalidConfiguration> {
        self.into_builder().build()
    }

    /// Convert into a builder so callers can layer further overrides.
    pub fn into_builder(self) -> RetryOptionsBuilder {
        RetryOptionsBuilder {
            policy_kind: self.policy_kind,
            max_tries: self.max_tries,
            try_timeout: self.try_timeout.map(Duration::from_secs),
            retry_delay: self.retry_delay.map(Duration::from_millis),
            max_retry_delay: self.max_retry_delay.map(Duration::from_millis),
            secondary_host: self.secondary_host,
        }
    }
}
