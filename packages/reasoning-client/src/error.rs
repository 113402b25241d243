//! Error types for the reasoning service client.

use thiserror::Error;

/// Result type for reasoning client operations.
pub type Result<T> = std::result::Result<T, ReasoningError>;

/// Reasoning service client errors.
#[derive(Debug, Error)]
pub enum ReasoningError {
    /// Configuration error (missing base URL, invalid settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network error (connection failed)
    #[error("Network error: {0}")]
    Network(String),

    /// The call exceeded the client deadline
    #[error("Reasoning service call timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// API error (non-2xx response, rate limit, invalid request)
    #[error("API error: {0}")]
    Api(String),

    /// Parse error (invalid JSON, unexpected response format)
    #[error("Parse error: {0}")]
    Parse(String),
}

impl ReasoningError {
    /// Whether the failure is a deadline expiry rather than a hard fault.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ReasoningError::Timeout(_))
    }
}
