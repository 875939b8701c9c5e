//! Error types for provider calls

use thiserror::Error;

/// Result type for provider calls
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors raised while talking to a completion provider
#[derive(Error, Debug)]
pub enum LLMError {
    /// Non-success HTTP status not covered by a narrower variant
    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid API key or authentication failed")]
    AuthenticationFailed,

    /// HTTP 429 from the provider
    #[error("Rate limit exceeded (Too Many Requests): {0}")]
    RateLimitExceeded(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Body did not have the expected shape
    #[error("Unexpected response format: {0}")]
    UnexpectedResponse(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}
