//! Synthesis stage: the final investment call

use super::{AnalysisStage, Brief, Delegate, StageContext};
use crate::error::{ResearchError, Result};
use crate::schema::{StageKind, StageOutput};
use async_trait::async_trait;
use research_core::Persona;
use research_tools::ToolRegistry;
use serde_json::json;
use std::sync::Arc;
use tracing::instrument;

fn brief() -> Brief {
    Brief {
        kind: StageKind::Recommendation,
        persona: Persona::new(
            "Hedge Fund Manager",
            "Manage a stock portfolio by weighing news, technical and fundamental analysis \
             into a single strategic decision.",
            "A seasoned fund manager who has made consistently profitable calls by combining \
             every kind of analysis available.",
        ),
        description: "Combine the news, technical and fundamental analyses in the reference \
            data into one investment decision. Decide BUY, SELL or HOLD and give a confidence \
            score from 0 to 100. The report must explain the decision: summarise the \
            sentiment, the technical picture and the financial health, list the main risks \
            and say what would change your view. Use only the reference data.",
        expected_output: "The ticker symbol, recommendation (BUY, SELL or HOLD), a narrative \
            report and a score between 0 and 100.",
    }
}

/// Reasoning-only stage over the three upstream reports
pub struct SynthesisStage {
    delegate: Delegate,
    tools: Arc<ToolRegistry>,
}

impl SynthesisStage {
    pub fn new(delegate: Delegate) -> Self {
        Self {
            delegate,
            tools: Arc::new(ToolRegistry::new()),
        }
    }
}

#[async_trait]
impl AnalysisStage for SynthesisStage {
    fn kind(&self) -> StageKind {
        StageKind::Recommendation
    }

    #[instrument(name = "synthesis_stage", skip_all, fields(symbol = %ctx.symbol))]
    async fn run(&self, ctx: &StageContext) -> Result<StageOutput> {
        let news = ctx
            .news
            .as_ref()
            .ok_or_else(|| ResearchError::MissingUpstream(StageKind::News))?;
        let technical = ctx
            .technical
            .as_ref()
            .ok_or_else(|| ResearchError::MissingUpstream(StageKind::Technical))?;
        let fundamental = ctx
            .fundamental
            .as_ref()
            .ok_or_else(|| ResearchError::MissingUpstream(StageKind::Fundamental))?;

        self.delegate
            .run(
                brief(),
                &ctx.symbol,
                json!({
                    "news": news,
                    "technical": technical,
                    "fundamental": fundamental,
                }),
                self.tools.clone(),
            )
            .await
    }
}
