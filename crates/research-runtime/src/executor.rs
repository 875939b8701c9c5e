//! Tool-calling agent loop
//!
//! 1. Send the conversation and tool definitions to the provider
//! 2. If the model asked for tools, run them and append the results
//! 3. Repeat until the model ends its turn or the iteration bound is hit

use research_core::{Error, Result};
use research_llm::{
    CompletionRequest, ContentBlock, LLMProvider, Message, ResponseFormat, StopReason, TokenUsage,
};
use research_tools::ToolRegistry;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

const PREVIEW_CHARS: usize = 300;

/// Settings for one agent loop
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Upper bound on provider round-trips
    pub max_iterations: usize,
    pub model: String,
    pub max_tokens: usize,
    pub temperature: Option<f32>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            model: "gpt-4.1-mini".to_string(),
            max_tokens: 4096,
            temperature: Some(0.2),
        }
    }
}

/// Final answer of a loop plus bookkeeping
#[derive(Debug, Clone)]
pub struct Execution {
    pub text: String,
    pub iterations: usize,
    pub usage: TokenUsage,
}

/// Runs the LLM → tools → LLM loop for one task
pub struct AgentExecutor {
    provider: Arc<dyn LLMProvider>,
    tools: Arc<ToolRegistry>,
    config: ExecutorConfig,
}

impl AgentExecutor {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        tools: Arc<ToolRegistry>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            config,
        }
    }

    /// Run the loop until the model produces a final text answer
    ///
    /// Hitting the iteration bound, a truncated answer, a filtered answer or
    /// an empty answer are all errors.
    pub async fn run(
        &self,
        system: String,
        user: String,
        response_format: Option<ResponseFormat>,
    ) -> Result<Execution> {
        let mut conversation = vec![Message::user(user)];
        let mut usage = TokenUsage::default();
        let definitions = self.tools.definitions();

        for iteration in 1..=self.config.max_iterations {
            debug!(
                iteration,
                max_iterations = self.config.max_iterations,
                tool_count = definitions.len(),
                "agent iteration started"
            );

            let mut builder = CompletionRequest::builder(&self.config.model)
                .messages(conversation.clone())
                .system(system.clone())
                .max_tokens(self.config.max_tokens)
                .tools(definitions.clone());
            if let Some(temperature) = self.config.temperature {
                builder = builder.temperature(temperature);
            }
            if let Some(format) = &response_format {
                builder = builder.response_format(format.clone());
            }

            let response = self
                .provider
                .complete(builder.build())
                .await
                .map_err(|e| Error::ProcessingFailed(format!("{} provider: {e}", self.provider.name())))?;
            usage += response.usage;

            info!(
                iteration,
                stop_reason = ?response.stop_reason,
                input_tokens = response.usage.input_tokens,
                output_tokens = response.usage.output_tokens,
                "LLM response received"
            );

            let message = response.message;

            if response.stop_reason == StopReason::ToolUse || message.has_tool_uses() {
                let results = self.execute_tools(&message).await;
                conversation.push(message);
                conversation.push(Message::tool_results(results));
                continue;
            }

            return match response.stop_reason {
                StopReason::MaxTokens => Err(Error::IncompleteResponse(
                    "answer truncated at the token limit".to_string(),
                )),
                StopReason::ContentFilter => Err(Error::IncompleteResponse(
                    "answer withheld by the provider's content filter".to_string(),
                )),
                _ => {
                    let text = message
                        .text()
                        .map(|t| t.trim().to_string())
                        .filter(|t| !t.is_empty())
                        .ok_or_else(|| {
                            Error::IncompleteResponse("model returned no text".to_string())
                        })?;
                    let preview: String = text.chars().take(PREVIEW_CHARS).collect();
                    debug!(iteration, %preview, "agent finished");
                    Ok(Execution {
                        text,
                        iterations: iteration,
                        usage,
                    })
                }
            };
        }

        warn!(
            max_iterations = self.config.max_iterations,
            "agent loop hit its iteration bound"
        );
        Err(Error::IterationLimit(self.config.max_iterations))
    }

    /// Run every requested tool; failures go back to the model as error results
    async fn execute_tools(&self, message: &Message) -> Vec<ContentBlock> {
        let mut results = Vec::new();

        for block in message.tool_uses() {
            let ContentBlock::ToolUse { id, name, input } = block else {
                continue;
            };

            let started = Instant::now();
            let outcome = self.tools.call(name, input.clone()).await;
            let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

            let (content, is_error) = match outcome {
                Ok(value) => {
                    debug!(tool = %name, duration_ms, "tool succeeded");
                    (value.to_string(), None)
                }
                Err(e) => {
                    warn!(tool = %name, duration_ms, error = %e, "tool failed");
                    (format!("Error: {e}"), Some(true))
                }
            };

            results.push(ContentBlock::ToolResult {
                tool_use_id: id.clone(),
                content,
                is_error,
            });
        }

        results
    }
}
