//! Error types for AI client operations

use thiserror::Error;

/// Result type for AI client operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur while generating text
#[derive(Error, Debug)]
pub enum LLMError {
    /// API request failed
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Invalid API key or authentication failed
    #[error("Invalid API key or authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Rate limit or quota exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Model not found
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// The provider refused to answer (safety filters)
    #[error("Response blocked: {0}")]
    ContentBlocked(String),

    /// Transport failure before a response arrived
    #[error("Network error: {0}")]
    Network(String),

    /// No response within the configured timeout
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Unexpected response format
    #[error("Unexpected response format: {0}")]
    UnexpectedResponse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

/// Convert LLMError to research_core::Error
impl From<LLMError> for research_core::Error {
    fn from(err: LLMError) -> Self {
        match err {
            LLMError::AuthenticationFailed(msg) => research_core::Error::Auth(msg),
            LLMError::RateLimitExceeded(msg) => research_core::Error::Quota(msg),
            LLMError::Network(_) | LLMError::Timeout(_) => {
                research_core::Error::Network(err.to_string())
            }
            LLMError::ConfigurationError(msg) => research_core::Error::Configuration(msg),
            other => research_core::Error::Provider(other.to_string()),
        }
    }
}
