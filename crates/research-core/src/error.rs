//! Error types for research-core

use thiserror::Error;

/// Result type alias for research-core
pub type Result<T> = std::result::Result<T, Error>;

/// Error type shared by tools and reasoning engines
#[derive(Error, Debug)]
pub enum Error {
    /// Generic error message
    #[error("{0}")]
    Generic(String),

    /// Engine or tool could not be set up
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// Processing failed inside an engine
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),

    /// Tool was called with input that does not match its schema
    #[error("Invalid input for tool '{tool}': {reason}")]
    InvalidToolInput {
        /// Tool name
        tool: String,
        /// What was wrong with the input
        reason: String,
    },

    /// Tool ran but failed
    #[error("Tool '{tool}' failed: {reason}")]
    ToolFailed {
        /// Tool name
        tool: String,
        /// Failure description
        reason: String,
    },

    /// The engine asked for a tool that is not registered
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// The agent loop did not finish within its iteration budget
    #[error("Iteration limit of {0} reached without a final answer")]
    IterationLimit(usize),

    /// The model stopped without producing a usable answer
    #[error("Incomplete response: {0}")]
    IncompleteResponse(String),
}

impl Error {
    /// Build a `ToolFailed` error from any displayable cause
    pub fn tool_failed(tool: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            reason: reason.to_string(),
        }
    }

    /// Build an `InvalidToolInput` error from any displayable cause
    pub fn invalid_input(tool: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::InvalidToolInput {
            tool: tool.into(),
            reason: reason.to_string(),
        }
    }
}
