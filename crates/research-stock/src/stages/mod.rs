//! Analysis stages
//!
//! A stage gathers its data through the
//! [`ResilientFetcher`](crate::fetcher::ResilientFetcher), hands an
//! [`AgentTask`] to the [`ReasoningEngine`] together with its tool set, and
//! parses the answer against its schema. Fetch failures during the gathering
//! step abort the stage; the engine never sees a half-filled context.

pub mod fundamental;
pub mod news;
pub mod synthesis;
pub mod technical;

pub use fundamental::FundamentalStage;
pub use news::NewsStage;
pub use synthesis::SynthesisStage;
pub use technical::TechnicalStage;

use crate::config::ReportLanguage;
use crate::error::{ResearchError, Result};
use crate::schema::{FundamentalReport, NewsReport, StageKind, StageOutput, TechnicalReport};
use async_trait::async_trait;
use research_core::{AgentTask, Persona};
use research_runtime::ReasoningEngine;
use research_tools::ToolRegistry;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Input of one stage run
#[derive(Debug, Clone, Default)]
pub struct StageContext {
    /// Normalised ticker symbol
    pub symbol: String,
    pub news: Option<NewsReport>,
    pub technical: Option<TechnicalReport>,
    pub fundamental: Option<FundamentalReport>,
}

impl StageContext {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Self::default()
        }
    }

    /// Context for the synthesis stage
    pub fn with_upstream(
        symbol: impl Into<String>,
        news: NewsReport,
        technical: TechnicalReport,
        fundamental: FundamentalReport,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            news: Some(news),
            technical: Some(technical),
            fundamental: Some(fundamental),
        }
    }
}

/// One unit of the pipeline
#[async_trait]
pub trait AnalysisStage: Send + Sync {
    fn kind(&self) -> StageKind;

    /// Produce this stage's validated output
    async fn run(&self, ctx: &StageContext) -> Result<StageOutput>;
}

/// Fixed description of a stage's delegated task
#[derive(Debug, Clone)]
pub(crate) struct Brief {
    pub kind: StageKind,
    pub persona: Persona,
    pub description: &'static str,
    pub expected_output: &'static str,
}

/// Pieces every stage needs to delegate its work
#[derive(Clone)]
pub struct Delegate {
    engine: Arc<dyn ReasoningEngine>,
    language: ReportLanguage,
}

impl Delegate {
    pub fn new(engine: Arc<dyn ReasoningEngine>, language: ReportLanguage) -> Self {
        Self { engine, language }
    }

    /// Build the task described by `brief`, run it and parse the answer
    pub(crate) async fn run(
        &self,
        brief: Brief,
        symbol: &str,
        context: Value,
        tools: Arc<ToolRegistry>,
    ) -> Result<StageOutput> {
        let kind = brief.kind;
        let task = AgentTask::builder(kind.as_str(), brief.persona)
            .subject(symbol)
            .description(format!("{}\n\n{}", brief.description, self.language.instruction()))
            .expected_output(brief.expected_output)
            .output_schema(kind.schema_name(), kind.json_schema())
            .context(context)
            .build();

        debug!(stage = %kind, symbol, tools = tools.len(), "delegating stage");
        let raw = self
            .engine
            .run(task, tools)
            .await
            .map_err(|source| ResearchError::Engine {
                stage: kind,
                source,
            })?;

        StageOutput::parse(kind, &raw, symbol)
    }
}
