//! Error types for research operations

use thiserror::Error;

/// Result type alias for research-core
pub type Result<T> = std::result::Result<T, Error>;

/// Caller-facing error taxonomy
///
/// Provider crates convert their own errors into this type so the engine and
/// the CLI only ever see one classification.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or rejected API key
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Rate limit or quota exhausted at the provider
    #[error("Quota exceeded: {0}")]
    Quota(String),

    /// Transient connectivity problem (DNS, TLS, timeout, reset)
    #[error("Network error: {0}")]
    Network(String),

    /// Provider answered, but not with something usable
    #[error("Provider error: {0}")]
    Provider(String),

    /// The request itself is malformed
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration is incomplete or inconsistent
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Short machine-friendly label for the error class
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth",
            Self::Quota(_) => "quota",
            Self::Network(_) => "network",
            Self::Provider(_) => "provider",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Configuration(_) => "configuration",
            Self::Serialization(_) => "serialization",
        }
    }
}
