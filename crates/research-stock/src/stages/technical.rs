//! Technical analysis stage

use super::{AnalysisStage, Brief, Delegate, StageContext};
use crate::analysis::TechnicalSnapshot;
use crate::error::Result;
use crate::fetcher::ResilientFetcher;
use crate::market::{Interval, Period};
use crate::schema::{StageKind, StageOutput};
use crate::tools;
use async_trait::async_trait;
use research_core::Persona;
use research_tools::ToolRegistry;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Closes included verbatim in the task context
const CONTEXT_CLOSES: usize = 30;

fn brief() -> Brief {
    Brief {
        kind: StageKind::Technical,
        persona: Persona::new(
            "Technical Analyst",
            "Analyse the price movements of a stock and identify trend, momentum, \
             support and resistance.",
            "An expert in technical analysis known for disciplined, data-driven reads of \
             price action.",
        ),
        description: "Perform a technical analysis of the stock. The reference data holds a \
            snapshot computed from three months of daily closes: report its rsi, macd \
            histogram and signal, support_levels, resistance_levels and trend exactly as \
            given. Use the price and indicator tools to check other windows (for example \
            1y weekly) before settling on your reading.",
        expected_output: "The ticker symbol, rsi, macd {hist, signal}, support_levels, \
            resistance_levels and trend (up, down or sideways).",
    }
}

/// Indicator-driven view of recent price action
pub struct TechnicalStage {
    delegate: Delegate,
    fetcher: Arc<ResilientFetcher>,
    tools: Arc<ToolRegistry>,
}

impl TechnicalStage {
    pub fn new(delegate: Delegate, fetcher: Arc<ResilientFetcher>) -> Self {
        let tools = Arc::new(ToolRegistry::with_tools(tools::technical_tools(
            fetcher.clone(),
        )));
        Self {
            delegate,
            fetcher,
            tools,
        }
    }
}

#[async_trait]
impl AnalysisStage for TechnicalStage {
    fn kind(&self) -> StageKind {
        StageKind::Technical
    }

    #[instrument(name = "technical_stage", skip_all, fields(symbol = %ctx.symbol))]
    async fn run(&self, ctx: &StageContext) -> Result<StageOutput> {
        let series = self
            .fetcher
            .price_series(&ctx.symbol, Period::ThreeMonths, Interval::Daily)
            .await?;
        let snapshot = TechnicalSnapshot::from_series(&series)?;
        debug!(bars = snapshot.bars, rsi = ?snapshot.rsi, trend = %snapshot.trend, "snapshot ready");

        let closes = series.closes();
        let recent = &closes[closes.len().saturating_sub(CONTEXT_CLOSES)..];

        self.delegate
            .run(
                brief(),
                &ctx.symbol,
                json!({"snapshot": snapshot, "recent_closes": recent}),
                self.tools.clone(),
            )
            .await
    }
}
