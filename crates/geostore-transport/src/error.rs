//! Transport error types

use thiserror::Error;

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors that can occur while sending a request through the pipeline
#[derive(Debug, Error)]
pub enum TransportError {
    /// Protocol-level failure that another attempt will not fix
    #[error("HTTP error: {0}")]
    Http(String),

    /// Connection could not be established or was lost mid-exchange
    #[error("Connection error: {0}")]
    Connection(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The attempt did not complete before its deadline
    #[error("Timeout")]
    Timeout,

    /// The request URL or a failover host could not be used
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The caller cancelled the logical request
    #[error("Request cancelled")]
    Cancelled,
}

impl TransportError {
    /// Whether the failure is transient at the network level.
    ///
    /// Timeouts, connection failures and I/O errors qualify. Everything else
    /// would fail the same way on another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::Connection(_) | Self::Io(_)
        )
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() || err.is_request() || err.is_body() {
            Self::Connection(err.to_string())
        } else {
            Self::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for TransportError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}
