//! Financial statement tools

use super::{parse_params, tool_error};
use crate::analysis::FundamentalMetrics;
use crate::fetcher::{FetchRequest, ResilientFetcher};
use async_trait::async_trait;
use research_core::Result as CoreResult;
use research_llm::tools::schema;
use research_tools::Tool;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct SymbolParams {
    symbol: String,
}

fn symbol_schema() -> Value {
    schema::object(
        json!({"symbol": schema::string("Stock ticker symbol (e.g. AAPL)")}),
        &["symbol"],
    )
}

/// Raw statement fetch: income statement, balance sheet or insider activity
pub struct StatementTool {
    fetcher: Arc<ResilientFetcher>,
    request: FetchRequest,
    name: &'static str,
    description: &'static str,
}

impl StatementTool {
    /// `request` other than the three statement kinds falls back to the
    /// income statement
    pub fn new(fetcher: Arc<ResilientFetcher>, request: FetchRequest) -> Self {
        let (request, name, description) = match request {
            FetchRequest::BalanceSheet => (
                request,
                "balance_sheet",
                "Fetch recent annual and quarterly balance sheets of a company.",
            ),
            FetchRequest::InsiderTransactions => (
                request,
                "insider_transactions",
                "Fetch recent insider purchases and sales of a company's stock.",
            ),
            _ => (
                FetchRequest::IncomeStatement,
                "income_statement",
                "Fetch recent annual and quarterly income statements of a company.",
            ),
        };
        Self {
            fetcher,
            request,
            name,
            description,
        }
    }
}

#[async_trait]
impl Tool for StatementTool {
    async fn execute(&self, params: Value) -> CoreResult<Value> {
        let params: SymbolParams = parse_params(self.name, params)?;
        self.fetcher
            .fetch(&params.symbol, self.request)
            .await
            .map_err(tool_error(self.name))
    }

    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn input_schema(&self) -> Value {
        symbol_schema()
    }
}

/// Growth and leverage ratios computed from the latest annual statements
pub struct FundamentalMetricsTool {
    fetcher: Arc<ResilientFetcher>,
}

impl FundamentalMetricsTool {
    const NAME: &'static str = "fundamental_metrics";

    pub fn new(fetcher: Arc<ResilientFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Tool for FundamentalMetricsTool {
    async fn execute(&self, params: Value) -> CoreResult<Value> {
        let params: SymbolParams = parse_params(Self::NAME, params)?;
        let (income, balance) = tokio::try_join!(
            self.fetcher.fetch(&params.symbol, FetchRequest::IncomeStatement),
            self.fetcher.fetch(&params.symbol, FetchRequest::BalanceSheet),
        )
        .map_err(tool_error(Self::NAME))?;

        let metrics = FundamentalMetrics::from_statements(&income, &balance);
        Ok(json!({
            "symbol": params.symbol.trim().to_uppercase(),
            "metrics": metrics,
        }))
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Revenue and EPS growth year over year (percent), return on equity, \
         debt to equity and cash flow from the latest annual statements. Cash flow \
         is net income plus depreciation and amortization when operating cash flow \
         is not reported."
    }

    fn input_schema(&self) -> Value {
        symbol_schema()
    }
}
