//! Map HTTP statuses to retry decisions.

use super::endpoint::Endpoint;

/// What the attempt loop should do with an outcome.
///
/// Classification ignores the attempt budget; the loop checks that separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Stop and hand this outcome to the caller, whatever its status.
    Success,
    /// Try again.
    Retryable,
    /// Try again against primary and never use secondary for this request again.
    RetryableAndDisableSecondary,
    /// Stop and surface the error; another attempt cannot fix it.
    NonRetryable,
}

impl Classification {
    /// Whether another attempt is warranted, budget permitting.
    pub fn should_retry(self) -> bool {
        matches!(
            self,
            Classification::Retryable | Classification::RetryableAndDisableSecondary
        )
    }

    /// Whether the secondary host must be disabled for the rest of the request.
    pub fn disables_secondary(self) -> bool {
        matches!(self, Classification::RetryableAndDisableSecondary)
    }
}

/// Classify a response status from an attempt against `endpoint`.
///
/// - 404 from secondary: the replica may lag, retry against primary
/// - 500, 503: transient server failure
/// - everything else, including 501 and 505: final
pub fn classify_status(status: u16, endpoint: Endpoint) -> Classification {
    match status {
        404 if endpoint == Endpoint::Secondary => Classification::RetryableAndDisableSecondary,
        500 | 503 => Classification::Retryable,
        _ => Classification::Success,
    }
}
