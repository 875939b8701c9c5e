//! Reasoning engine seam

use crate::executor::{AgentExecutor, ExecutorConfig};
use async_trait::async_trait;
use research_core::{AgentTask, Result};
use research_llm::{LLMProvider, ResponseFormat};
use research_tools::ToolRegistry;
use std::sync::Arc;
use tracing::{info, instrument};

/// Turns an [`AgentTask`] into answer text
///
/// The returned text is expected to satisfy the task's output schema, but
/// the engine does not validate it; callers parse and check it.
#[async_trait]
pub trait ReasoningEngine: Send + Sync {
    async fn run(&self, task: AgentTask, tools: Arc<ToolRegistry>) -> Result<String>;
}

/// Engine backed by an LLM provider with tool calling
pub struct ToolAgentEngine {
    provider: Arc<dyn LLMProvider>,
    config: ExecutorConfig,
}

impl ToolAgentEngine {
    pub fn new(provider: Arc<dyn LLMProvider>, config: ExecutorConfig) -> Self {
        Self { provider, config }
    }
}

#[async_trait]
impl ReasoningEngine for ToolAgentEngine {
    #[instrument(skip_all, fields(task = %task.name, subject = %task.subject, provider = self.provider.name()))]
    async fn run(&self, task: AgentTask, tools: Arc<ToolRegistry>) -> Result<String> {
        let response_format = task
            .output_schema
            .as_ref()
            .map(|s| ResponseFormat::strict_schema(s.name.clone(), s.schema.clone()));

        let executor = AgentExecutor::new(self.provider.clone(), tools, self.config.clone());
        let execution = executor
            .run(task.system_prompt(), task.user_prompt(), response_format)
            .await?;

        info!(
            iterations = execution.iterations,
            total_tokens = execution.usage.total(),
            "task answered"
        );
        Ok(execution.text)
    }
}
