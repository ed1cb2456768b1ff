use std::time::Duration;

use thiserror::Error;

use crate::core::models::ErrorResponse;

/// Message shown when the summarization provider rejects us with HTTP 429.
pub const PROVIDER_RATE_LIMIT_MESSAGE: &str = "upstream request limit exceeded, retry later";

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("Method {0} is not allowed; use POST")]
    MethodNotAllowed(String),

    #[error("Upload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("Too many analysis requests, try again in {}s", .retry_after.as_secs().max(1))]
    RateLimitExceeded { retry_after: Duration },

    #[error("Malformed upload: {0}")]
    MalformedRequest(String),

    #[error("Could not read the PDF document: {0}")]
    UnreadableDocument(String),

    #[error("{}", PROVIDER_RATE_LIMIT_MESSAGE)]
    ProviderRateLimit { retry_after: Option<Duration> },

    #[error("Summarization provider failed: {detail}")]
    Provider { detail: String, transient: bool },

    #[error("Summarization provider did not answer within {}s", .0.as_secs())]
    ProviderTimeout(Duration),
}

impl AnalyzeError {
    /// HTTP status returned to the caller for this failure.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::MethodNotAllowed(_) => 405,
            Self::PayloadTooLarge { .. } => 413,
            Self::RateLimitExceeded { .. } => 429,
            Self::MalformedRequest(_) => 400,
            Self::UnreadableDocument(_) | Self::Provider { .. } => 500,
            Self::ProviderRateLimit { .. } => 502,
            Self::ProviderTimeout(_) => 504,
        }
    }

    /// Stable machine-readable code placed in the `error` field.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MethodNotAllowed(_) => "method_not_allowed",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::RateLimitExceeded { .. } => "rate_limit_exceeded",
            Self::MalformedRequest(_) => "malformed_request",
            Self::UnreadableDocument(_) => "unreadable_document",
            Self::ProviderRateLimit { .. } => "provider_rate_limited",
            Self::Provider { .. } => "provider_error",
            Self::ProviderTimeout(_) => "provider_timeout",
        }
    }

    /// Seconds the caller should wait before retrying, when known.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimitExceeded { retry_after } => Some(*retry_after),
            Self::ProviderRateLimit { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Only transport failures and 5xx answers are retried.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Provider { transient: true, .. })
    }

    pub fn provider(detail: impl Into<String>) -> Self {
        Self::Provider {
            detail: detail.into(),
            transient: false,
        }
    }

    pub fn transient_provider(detail: impl Into<String>) -> Self {
        Self::Provider {
            detail: detail.into(),
            transient: true,
        }
    }

    #[must_use]
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.code().to_string(),
            details: self.to_string(),
        }
    }
}

impl From<multer::Error> for AnalyzeError {
    fn from(error: multer::Error) -> Self {
        AnalyzeError::MalformedRequest(error.to_string())
    }
}

impl From<lopdf::Error> for AnalyzeError {
    fn from(error: lopdf::Error) -> Self {
        AnalyzeError::UnreadableDocument(error.to_string())
    }
}
