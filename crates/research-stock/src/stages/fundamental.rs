//! Fundamental analysis stage

use super::{AnalysisStage, Brief, Delegate, StageContext};
use crate::analysis::FundamentalMetrics;
use crate::error::Result;
use crate::fetcher::{FetchRequest, ResilientFetcher};
use crate::schema::{StageKind, StageOutput};
use crate::tools;
use async_trait::async_trait;
use research_core::Persona;
use research_tools::ToolRegistry;
use serde_json::json;
use std::sync::Arc;
use tracing::instrument;

fn brief() -> Brief {
    Brief {
        kind: StageKind::Fundamental,
        persona: Persona::new(
            "Financial Analyst",
            "Use financial statements, insider trading data and other metrics to evaluate \
             a company's financial health and performance.",
            "A very experienced investment advisor who weighs a company's financial health \
             against its market context.",
        ),
        description: "Evaluate the company's fundamentals. The reference data holds metrics \
            computed from the latest annual statements (growth in percent, ratios as \
            fractions) and recent insider transactions. cash_flow is operating cash flow \
            when reported, otherwise net income plus depreciation and amortization. \
            Where a metric is null, derive it from the statement tools; if it cannot be \
            derived, report 0.",
        expected_output: "The ticker symbol, revenue_yoy, eps_yoy, roe, debt_to_equity and \
            cash_flow as numbers.",
    }
}

/// Financial health from statements and insider activity
pub struct FundamentalStage {
    delegate: Delegate,
    fetcher: Arc<ResilientFetcher>,
    tools: Arc<ToolRegistry>,
}

impl FundamentalStage {
    pub fn new(delegate: Delegate, fetcher: Arc<ResilientFetcher>) -> Self {
        let tools = Arc::new(ToolRegistry::with_tools(tools::fundamental_tools(
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
impl AnalysisStage for FundamentalStage {
    fn kind(&self) -> StageKind {
        StageKind::Fundamental
    }

    #[instrument(name = "fundamental_stage", skip_all, fields(symbol = %ctx.symbol))]
    async fn run(&self, ctx: &StageContext) -> Result<StageOutput> {
        let symbol = ctx.symbol.as_str();
        let (income, balance, insider) = tokio::try_join!(
            self.fetcher.fetch(symbol, FetchRequest::IncomeStatement),
            self.fetcher.fetch(symbol, FetchRequest::BalanceSheet),
            self.fetcher.fetch(symbol, FetchRequest::InsiderTransactions),
        )?;
        let metrics = FundamentalMetrics::from_statements(&income, &balance);

        self.delegate
            .run(
                brief(),
                symbol,
                json!({"metrics": metrics, "insider_transactions": insider}),
                self.tools.clone(),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReportLanguage;
    use crate::stages::test_support::CannedEngine;
    use crate::tools::test_support::fetcher;

    #[tokio::test]
    async fn test_fundamental_stage() {
        let answer = json!({
            "symbol": "IBM",
            "revenue_yoy": 20.0,
            "eps_yoy": 20.0,
            "roe": 0.2,
            "debt_to_equity": 0.5,
            "cash_flow": 0
        });
        let engine = Arc::new(CannedEngine::new(answer.to_string()));
        let stage = FundamentalStage::new(
            Delegate::new(engine.clone(), ReportLanguage::English),
            fetcher(vec![]),
        );

        let report = stage
            .run(&StageContext::new("IBM"))
            .await
            .unwrap()
            .into_fundamental()
            .unwrap();
        assert!((report.roe - 0.2).abs() < 1e-9);

        let tasks = engine.tasks.lock().unwrap();
        let context = &tasks[0].context;
        assert!((context["metrics"]["revenue_yoy"].as_f64().unwrap() - 20.0).abs() < 1e-9);
        assert!(context["insider_transactions"]["transactions"].is_array());
        assert_eq!(engine.tool_names.lock().unwrap()[0].len(), 4);
    }
}
