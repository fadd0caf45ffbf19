//! Error types for news and market sources

use std::time::Duration;
use thiserror::Error;

/// Result type alias for source operations
pub type Result<T> = std::result::Result<T, SourceError>;

/// Errors raised by the optional data sources
#[derive(Debug, Error)]
pub enum SourceError {
    /// Transport failure before a response arrived
    #[error("Request to {provider} failed: {message}")]
    RequestFailed {
        provider: &'static str,
        message: String,
    },

    /// Provider answered with an error status
    #[error("{provider} API error ({status}): {message}")]
    ApiError {
        provider: &'static str,
        status: u16,
        message: String,
    },

    /// API key missing, invalid or disabled
    #[error("{provider} rejected the API key: {message}")]
    Unauthorized {
        provider: &'static str,
        message: String,
    },

    /// Rate limit exceeded for API
    #[error("Rate limit exceeded for {provider}")]
    RateLimited { provider: &'static str },

    /// Response body did not match the expected shape
    #[error("Failed to parse {provider} response: {message}")]
    ParseError {
        provider: &'static str,
        message: String,
    },

    /// No response within the configured timeout
    #[error("{provider} request timed out after {secs}s")]
    Timeout { provider: &'static str, secs: u64 },

    /// Configuration error
    #[error("Configuration error: {0}")]
    InvalidConfig(String),
}

impl SourceError {
    /// Classify a reqwest failure
    pub(crate) fn transport(provider: &'static str, timeout: Duration, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                provider,
                secs: timeout.as_secs(),
            }
        } else {
            // without_url keeps query strings out of the message
            Self::RequestFailed {
                provider,
                message: err.without_url().to_string(),
            }
        }
    }

    /// Classify an error status
    pub(crate) fn from_status(provider: &'static str, status: u16, message: String) -> Self {
        match status {
            401 | 403 => Self::Unauthorized { provider, message },
            429 => Self::RateLimited { provider },
            _ => Self::ApiError {
                provider,
                status,
                message,
            },
        }
    }

    /// Build the shared HTTP client with a request timeout
    pub(crate) fn client(timeout: Duration) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Self::InvalidConfig(format!("HTTP client: {e}")))
    }
}

/// Convert SourceError to research_core::Error
impl From<SourceError> for research_core::Error {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Unauthorized { .. } => research_core::Error::Auth(err.to_string()),
            SourceError::RateLimited { .. } => research_core::Error::Quota(err.to_string()),
            SourceError::RequestFailed { .. } | SourceError::Timeout { .. } => {
                research_core::Error::Network(err.to_string())
            }
            SourceError::InvalidConfig(msg) => research_core::Error::Configuration(msg),
            SourceError::ApiError { .. } | SourceError::ParseError { .. } => {
                research_core::Error::Provider(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SourceError::RateLimited { provider: "NewsAPI" };
        assert_eq!(err.to_string(), "Rate limit exceeded for NewsAPI");

        let err = SourceError::Timeout {
            provider: "Finnhub",
            secs: 30,
        };
        assert_eq!(err.to_string(), "Finnhub request timed out after 30s");
    }

    #[test]
    fn test_from_status() {
        assert!(matches!(
            SourceError::from_status("NewsAPI", 401, "bad key".into()),
            SourceError::Unauthorized { .. }
        ));
        assert!(matches!(
            SourceError::from_status("NewsAPI", 429, String::new()),
            SourceError::RateLimited { .. }
        ));
        assert!(matches!(
            SourceError::from_status("Finnhub", 500, "boom".into()),
            SourceError::ApiError { status: 500, .. }
        ));
    }

    #[test]
    fn test_error_conversion() {
        let core: research_core::Error = SourceError::Unauthorized {
            provider: "NewsAPI",
            message: "apiKeyInvalid".into(),
        }
        .into();
        assert!(matches!(core, research_core::Error::Auth(_)));

        let core: research_core::Error = SourceError::Timeout {
            provider: "Finnhub",
            secs: 5,
        }
        .into();
        match core {
            research_core::Error::Network(msg) => assert!(msg.contains("timed out")),
            other => panic!("Expected Network variant, got {other:?}"),
        }
    }
}
