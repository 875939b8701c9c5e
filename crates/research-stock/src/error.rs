//! Error types for the research pipeline

use crate::schema::StageKind;
use thiserror::Error;

/// Research pipeline errors
#[derive(Debug, Error)]
pub enum ResearchError {
    /// Provider refused the call for exceeding its quota
    #[error("Rate limited by {provider}: {message}")]
    RateLimited { provider: String, message: String },

    /// Non-retryable data-provider failure
    #[error("Fetch failed for {symbol} ({request}): {reason}")]
    Fetch {
        symbol: String,
        request: String,
        reason: String,
    },

    /// Stage output did not parse or did not match its schema
    #[error("{stage} output failed schema validation: {reason}")]
    SchemaValidation { stage: StageKind, reason: String },

    /// Storage write failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Missing or unusable input at the entry point
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Synthesis ran without one of the reports it combines
    #[error("synthesis requires the {0} report")]
    MissingUpstream(StageKind),

    /// The reasoning engine failed while working on a stage
    #[error("{stage} stage failed: {source}")]
    Engine {
        stage: StageKind,
        #[source]
        source: research_core::Error,
    },

    /// Indicator parameters were invalid
    #[error("Indicator error: {0}")]
    Indicator(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type alias for research operations
pub type Result<T> = std::result::Result<T, ResearchError>;

/// Substrings providers use when they throttle a caller
const RATE_LIMIT_SIGNATURES: [&str; 4] = [
    "too many requests",
    "429",
    "rate limit",
    "api call frequency",
];

/// Whether a provider or network message carries a rate-limit signature
pub fn looks_rate_limited(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    RATE_LIMIT_SIGNATURES.iter().any(|sig| lower.contains(sig))
}

impl ResearchError {
    /// Whether this failure is transient throttling worth retrying
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Http(e) => {
                e.status().is_some_and(|s| s.as_u16() == 429) || looks_rate_limited(&e.to_string())
            }
            Self::Fetch { reason, .. } => looks_rate_limited(reason),
            _ => false,
        }
    }

    /// Classify a provider error message as throttling or a plain fetch failure
    pub fn from_provider(
        provider: &str,
        symbol: &str,
        request: impl std::fmt::Display,
        message: impl Into<String>,
    ) -> Self {
        let message = message.into();
        if looks_rate_limited(&message) {
            Self::RateLimited {
                provider: provider.to_string(),
                message,
            }
        } else {
            Self::Fetch {
                symbol: symbol.to_string(),
                request: request.to_string(),
                reason: message,
            }
        }
    }

    /// Stage this error is attributed to, if any
    pub fn stage(&self) -> Option<StageKind> {
        match self {
            Self::SchemaValidation { stage, .. } | Self::Engine { stage, .. } => Some(*stage),
            Self::MissingUpstream(_) => Some(StageKind::Recommendation),
            _ => None,
        }
    }
}

/// Tool failures surface to the reasoning engine as core errors
impl From<ResearchError> for research_core::Error {
    fn from(err: ResearchError) -> Self {
        research_core::Error::ProcessingFailed(err.to_string())
    }
}
