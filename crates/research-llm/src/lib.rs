//! Chat-completion provider layer
//!
//! Provider-agnostic request/response types, tool definitions for function
//! calling, structured-output response formats, and an OpenAI-compatible
//! provider.

pub mod completion;
pub mod error;
pub mod messages;
pub mod provider;
pub mod providers;
pub mod tools;

pub use completion::{
    CompletionRequest, CompletionRequestBuilder, CompletionResponse, ResponseFormat, StopReason,
    TokenUsage,
};
pub use error::{LLMError, Result};
pub use messages::{ContentBlock, Message, MessageContent, Role};
pub use provider::LLMProvider;
pub use tools::ToolDefinition;
