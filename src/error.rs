//! Error types for the outreach email generation service.

use thiserror::Error;

/// Service-level errors surfaced by the generation pipeline and HTTP boundary
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Provider request failed: {0}")]
    ProviderRequestFailed(String),

    #[error("Provider authentication failed: {0}")]
    ProviderAuthFailed(String),

    #[error("Provider rate limit exceeded: {0}")]
    ProviderRateLimit(String),

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Failed to parse model reply: {reason}; raw reply: {raw}")]
    ParseError { reason: String, raw: String },
}

impl ApiError {
    /// Transient provider failures (rate limiting, server-side errors) are
    /// eligible for retry; everything else propagates immediately.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ApiError::ProviderRateLimit(_) | ApiError::ProviderUnavailable(_)
        )
    }
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(ApiError::ProviderRateLimit("429".into()).is_transient());
        assert!(ApiError::ProviderUnavailable("503".into()).is_transient());
        assert!(!ApiError::ProviderAuthFailed("401".into()).is_transient());
        assert!(!ApiError::ProviderRequestFailed("400".into()).is_transient());
        assert!(!ApiError::ConfigError("missing key".into()).is_transient());
    }

    #[test]
    fn parse_error_carries_raw_reply() {
        let err = ApiError::ParseError {
            reason: "missing field `subject`".into(),
            raw: "not json at all".into(),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("missing field `subject`"));
        assert!(rendered.contains("not json at all"));
    }
}
