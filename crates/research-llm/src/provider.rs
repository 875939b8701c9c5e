//! Provider trait

use crate::{CompletionRequest, CompletionResponse, Result};
use async_trait::async_trait;

/// A chat-completion backend
///
/// Implementations translate [`CompletionRequest`] into a vendor wire format
/// and map the vendor reply back into a [`CompletionResponse`].
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Run one completion round
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Provider name used in logs (e.g. "openai")
    fn name(&self) -> &str;
}
