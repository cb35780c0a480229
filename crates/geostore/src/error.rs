//! Error types for the geostore client
//!
//! Transport failures and retry configuration problems are wrapped as they
//! are; terminal HTTP statuses are mapped onto variants by
//! [`Error::from_response`].

use geostore_core::retry::InvalidConfiguration;
use geostore_transport::{HttpResponse, TransportError};
use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Header carrying the service-assigned request id.
pub const REQUEST_ID_HEADER: &str = "x-ms-request-id";

/// Header carrying the service error code.
pub const ERROR_CODE_HEADER: &str = "x-ms-error-code";

/// Main error type for the geostore client.
#[derive(Debug, Error)]
pub enum Error {
    /// Retry options failed validation.
    #[error("Invalid retry configuration: {0}")]
    InvalidConfiguration(#[from] InvalidConfiguration),

    /// The pipeline produced no response: connection failure, timeout,
    /// cancellation, or a protocol error.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Authorization failed (401/403).
    #[error("Permission denied (status {status}): {message}")]
    PermissionDenied {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// Resource not found (404).
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Conflict or failed precondition (409/412).
    #[error("Conflict (status {status}): {message}")]
    Conflict {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// Server error (5xx) that survived the retry budget or was not retryable.
    #[error("Server error (status {status}): {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
        /// Request ID for debugging
        request_id: Option<String>,
    },

    /// Any other non-success status.
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
        /// Request ID for debugging
        request_id: Option<String>,
    },

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Missing required configuration.
    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    /// Configuration value could not be parsed.
    #[error("Invalid configuration value: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors not covered by specific variants.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Map a terminal non-success response onto an error.
    ///
    /// The message prefers the `x-ms-error-code` header, then the body text,
    /// then the status itself.
    pub fn from_response(response: &HttpResponse) -> Self {
        let status = response.status;
        let request_id = response.get_header(REQUEST_ID_HEADER).map(str::to_string);
        let message = response
            .get_header(ERROR_CODE_HEADER)
            .map(str::to_string)
            .or_else(|| {
                response
                    .text()
                    .ok()
                    .map(|body| body.trim().to_string())
                    .filter(|body| !body.is_empty())
            })
            .unwrap_or_else(|| format!("HTTP {}", status));

        match status {
            401 | 403 => Error::PermissionDenied { status, message },
            404 => Error::NotFound(message),
            409 | 412 => Error::Conflict { status, message },
            500..=599 => Error::Server {
                status,
                message,
                request_id,
            },
            _ => Error::Api {
                status,
                message,
                request_id,
            },
        }
    }

    /// HTTP status behind this error, if it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::PermissionDenied { status, .. }
            | Error::Conflict { status, .. }
            | Error::Server { status, .. }
            | Error::Api { status, .. } => Some(*status),
            Error::NotFound(_) => Some(404),
            _ => None,
        }
    }

    /// Whether the error was a cancellation of the logical request.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Transport(TransportError::Cancelled))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::InvalidUrl(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}
