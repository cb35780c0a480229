//! Configuration for the geostore client

use crate::error::{Error, Result};
use geostore_core::retry::{
    RetryOptions, RetryOptionsBuilder, RetryPolicyKind, RetrySettings,
};
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Environment variable holding the primary endpoint URL.
pub const ENV_ENDPOINT: &str = "GEOSTORE_ENDPOINT";
/// Environment variable holding the read-only secondary host.
pub const ENV_SECONDARY_HOST: &str = "GEOSTORE_SECONDARY_HOST";
/// Environment variable holding the total attempt budget.
pub const ENV_MAX_TRIES: &str = "GEOSTORE_MAX_TRIES";
/// Environment variable holding the per-attempt timeout, in seconds.
pub const ENV_TRY_TIMEOUT: &str = "GEOSTORE_TRY_TIMEOUT";
/// Environment variable holding the base backoff delay, in milliseconds.
pub const ENV_RETRY_DELAY_MS: &str = "GEOSTORE_RETRY_DELAY_MS";
/// Environment variable holding the maximum backoff delay, in milliseconds.
pub const ENV_MAX_RETRY_DELAY_MS: &str = "GEOSTORE_MAX_RETRY_DELAY_MS";
/// Environment variable holding the backoff kind (`exponential` or `fixed`).
pub const ENV_RETRY_POLICY: &str = "GEOSTORE_RETRY_POLICY";
/// Environment variable holding the bearer token.
pub const ENV_TOKEN: &str = "GEOSTORE_TOKEN";

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

fn default_user_agent() -> String {
    format!("geostore-rust/{}", crate::VERSION)
}

/// Configuration for the geostore client.
///
/// Construct with [`ClientConfig::builder`], [`ClientConfig::from_env`] or
/// [`ClientConfig::from_toml_str`]; all three validate the endpoint and the
/// retry options.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Primary endpoint; request paths are joined onto it
    pub endpoint: Url,

    /// Retry and failover options
    pub retry: RetryOptions,

    /// Bearer token sent on every attempt
    pub credential: Option<SecretString>,

    /// Headers added to every request unless the request already sets them
    pub default_headers: HashMap<String, String>,

    /// TCP connect timeout
    pub connect_timeout: Duration,

    /// User-Agent header value
    pub user_agent: String,
}

impl ClientConfig {
    /// Create a builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Create a configuration for `endpoint` with default retry options.
    pub fn new(endpoint: impl AsRef<str>) -> Result<Self> {
        Self::builder().endpoint(endpoint.as_ref()).build()
    }

    /// Load configuration from environment variables.
    ///
    /// This will look for:
    /// - `GEOSTORE_ENDPOINT` for the primary endpoint (required)
    /// - `GEOSTORE_SECONDARY_HOST` for the read-only secondary host
    /// - `GEOSTORE_MAX_TRIES` for the attempt budget
    /// - `GEOSTORE_TRY_TIMEOUT` for the per-attempt timeout (in seconds)
    /// - `GEOSTORE_RETRY_DELAY_MS` and `GEOSTORE_MAX_RETRY_DELAY_MS` for the backoff delays
    /// - `GEOSTORE_RETRY_POLICY` for the backoff kind
    /// - `GEOSTORE_TOKEN` for the bearer token
    #[cfg(feature = "env")]
    pub fn from_env() -> Result<Self> {
        use std::env;

        let endpoint =
            env::var(ENV_ENDPOINT).map_err(|_| Error::MissingConfig(ENV_ENDPOINT.to_string()))?;
        let mut builder = Self::builder().endpoint(endpoint);

        if let Ok(host) = env::var(ENV_SECONDARY_HOST) {
            builder = builder.secondary_host(host);
        }

        if let Ok(max_tries) = env::var(ENV_MAX_TRIES) {
            builder = builder.max_tries(parse_var(ENV_MAX_TRIES, &max_tries)?);
        }

        if let Ok(timeout) = env::var(ENV_TRY_TIMEOUT) {
            let secs: u64 = parse_var(ENV_TRY_TIMEOUT, &timeout)?;
            builder = builder.try_timeout(Duration::from_secs(secs));
        }

        if let Ok(delay) = env::var(ENV_RETRY_DELAY_MS) {
            let millis: u64 = parse_var(ENV_RETRY_DELAY_MS, &delay)?;
            builder = builder.map_retry(|retry| retry.retry_delay(Duration::from_millis(millis)));
        }

        if let Ok(delay) = env::var(ENV_MAX_RETRY_DELAY_MS) {
            let millis: u64 = parse_var(ENV_MAX_RETRY_DELAY_MS, &delay)?;
            builder =
                builder.map_retry(|retry| retry.max_retry_delay(Duration::from_millis(millis)));
        }

        if let Ok(kind) = env::var(ENV_RETRY_POLICY) {
            let kind: RetryPolicyKind = kind.parse()?;
            builder = builder.policy_kind(kind);
        }

        if let Ok(token) = env::var(ENV_TOKEN)
            && !token.trim().is_empty()
        {
            builder = builder.token(token);
        }

        builder.build()
    }

    /// Load a `.env` file from the working directory, if any, then read the
    /// environment as [`from_env`](Self::from_env) does.
    #[cfg(feature = "env")]
    pub fn from_dotenv() -> Result<Self> {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            return Err(anyhow::Error::new(err)
                .context("failed to load .env")
                .into());
        }
        Self::from_env()
    }

    /// Load variables from the env file at `path`, then read the environment
    /// as [`from_env`](Self::from_env) does.
    ///
    /// Variables already set in the process environment take precedence over
    /// the file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Other`] if the file is missing or malformed.
    #[cfg(feature = "env")]
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self> {
        use anyhow::Context;

        let path = path.as_ref();
        dotenvy::from_path(path)
            .with_context(|| format!("failed to load env file {}", path.display()))?;
        Self::from_env()
    }

    /// Parse configuration from TOML.
    ///
    /// ```toml
    /// endpoint = "https://account.blob.example.net"
    /// token = "..."
    /// connect_timeout_secs = 5
    ///
    /// [headers]
    /// x-ms-version = "2021-08-06"
    ///
    /// [retry]
    /// policyKind = "Exponential"
    /// maxTries = 4
    /// secondaryHost = "account-secondary.blob.example.net"
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(source)?;
        file.into_config()
    }

    /// Read and parse a TOML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }
}

#[cfg(feature = "env")]
fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{name}: cannot parse {value:?}")))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    endpoint: String,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    user_agent: Option<String>,
    #[serde(default)]
    connect_timeout_secs: Option<u64>,
    #[serde(default)]
    headers: HashMap<String, String>,
    #[serde(default)]
    retry: RetrySettings,
}

impl ConfigFile {
    fn into_config(self) -> Result<ClientConfig> {
        let mut builder = ClientConfig::builder()
            .endpoint(self.endpoint)
            .retry(self.retry.into_builder());
        if let Some(token) = self.token {
            builder = builder.token(token);
        }
        if let Some(user_agent) = self.user_agent {
            builder = builder.user_agent(user_agent);
        }
        if let Some(secs) = self.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        for (name, value) in self.headers {
            builder = builder.default_header(name, value)?;
        }
        builder.build()
    }
}

/// Builder for creating ClientConfig with a fluent API.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    endpoint: Option<String>,
    retry: RetryOptionsBuilder,
    credential: Option<SecretString>,
    default_headers: HashMap<String, String>,
    connect_timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl ClientConfigBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the primary endpoint.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Replace the retry options builder.
    pub fn retry(mut self, retry: RetryOptionsBuilder) -> Self {
        self.retry = retry;
        self
    }

    fn map_retry(mut self, f: impl FnOnce(RetryOptionsBuilder) -> RetryOptionsBuilder) -> Self {
        self.retry = f(self.retry);
        self
    }

    /// Set the backoff kind.
    pub fn policy_kind(self, kind: RetryPolicyKind) -> Self {
        self.map_retry(|retry| retry.policy_kind(kind))
    }

    /// Set the total number of attempts.
    pub fn max_tries(self, max_tries: u32) -> Self {
        self.map_retry(|retry| retry.max_tries(max_tries))
    }

    /// Set the per-attempt timeout.
    pub fn try_timeout(self, timeout: Duration) -> Self {
        self.map_retry(|retry| retry.try_timeout(timeout))
    }

    /// Set the base and maximum backoff delays.
    pub fn retry_delays(self, retry_delay: Duration, max_retry_delay: Duration) -> Self {
        self.map_retry(|retry| retry.retry_delay(retry_delay).max_retry_delay(max_retry_delay))
    }

    /// Set the read-only secondary host.
    pub fn secondary_host(self, host: impl Into<String>) -> Self {
        self.map_retry(|retry| retry.secondary_host(host))
    }

    /// Set the bearer token.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.credential = Some(SecretString::new(token.into().into_boxed_str()));
        self
    }

    /// Add a default header.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid according to HTTP specifications.
    pub fn default_header(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self> {
        let key = key.into();
        let value = value.into();

        http::HeaderName::from_bytes(key.as_bytes())
            .map_err(|_| Error::Config(format!("invalid header name {key:?}")))?;
        http::HeaderValue::from_str(&value)
            .map_err(|_| Error::Config(format!("invalid value for header {key:?}")))?;

        self.default_headers.insert(key, value);
        Ok(self)
    }

    /// Set the TCP connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the User-Agent header value.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingConfig`] if no endpoint was set
    /// - [`Error::InvalidUrl`] if the endpoint is not an absolute http(s) URL with a host
    /// - [`Error::InvalidConfiguration`] if the retry options are invalid
    pub fn build(self) -> Result<ClientConfig> {
        let endpoint = self
            .endpoint
            .ok_or_else(|| Error::MissingConfig("endpoint".to_string()))?;
        let endpoint = Url::parse(endpoint.trim())?;
        if !matches!(endpoint.scheme(), "http" | "https") || endpoint.host_str().is_none() {
            return Err(Error::InvalidUrl(format!(
                "{endpoint}: expected an http(s) URL with a host"
            )));
        }

        Ok(ClientConfig {
            endpoint,
            retry: self.retry.build()?,
            credential: self.credential,
            default_headers: self.default_headers,
            connect_timeout: self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            user_agent: self.user_agent.unwrap_or_else(default_user_agent),
        })
    }
}
