//! Tools exposed to the reasoning engine
//!
//! Every data tool fetches through the shared [`ResilientFetcher`], so tool
//! calls get the same retry policy as the stage prefetches.

pub mod fundamental;
pub mod news;
pub mod price;
pub mod scrape;
pub mod technical;

pub use fundamental::{FundamentalMetricsTool, StatementTool};
pub use news::StockNewsTool;
pub use price::StockPriceTool;
pub use scrape::ScrapeWebsiteTool;
pub use technical::{BollingerTool, MacdTool, RsiTool, TechnicalSnapshotTool};

use crate::error::ResearchError;
use crate::fetcher::{FetchRequest, ResilientFetcher};
use crate::market::{Interval, Period};
use research_tools::Tool;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Deserialize tool input, reporting schema mismatches as invalid input
pub(crate) fn parse_params<T: DeserializeOwned>(tool: &str, params: Value) -> research_core::Result<T> {
    serde_json::from_value(params).map_err(|e| research_core::Error::invalid_input(tool, e))
}

/// Report a research failure as a tool failure
pub(crate) fn tool_error(tool: &str) -> impl Fn(ResearchError) -> research_core::Error + '_ {
    move |e| research_core::Error::tool_failed(tool, e)
}

/// Input of tools that work on a price window
#[derive(Debug, Deserialize)]
pub(crate) struct PriceParams {
    pub symbol: String,
    #[serde(default)]
    pub period: Period,
    #[serde(default)]
    pub interval: Interval,
}

/// Tools of the news stage
pub fn news_tools(
    fetcher: Arc<ResilientFetcher>,
    timeout: Duration,
) -> crate::error::Result<Vec<Arc<dyn Tool>>> {
    Ok(vec![
        Arc::new(StockNewsTool::new(fetcher)),
        Arc::new(ScrapeWebsiteTool::new(timeout)?),
    ])
}

/// Tools of the technical stage
pub fn technical_tools(fetcher: Arc<ResilientFetcher>) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(StockPriceTool::new(fetcher.clone())),
        Arc::new(RsiTool::new(fetcher.clone())),
        Arc::new(MacdTool::new(fetcher.clone())),
        Arc::new(BollingerTool::new(fetcher.clone())),
        Arc::new(TechnicalSnapshotTool::new(fetcher)),
    ]
}

/// Tools of the fundamental stage
pub fn fundamental_tools(fetcher: Arc<ResilientFetcher>) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(StatementTool::new(fetcher.clone(), FetchRequest::IncomeStatement)),
        Arc::new(StatementTool::new(fetcher.clone(), FetchRequest::BalanceSheet)),
        Arc::new(StatementTool::new(fetcher.clone(), FetchRequest::InsiderTransactions)),
        Arc::new(FundamentalMetricsTool::new(fetcher)),
    ]
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::error::Result;
    use crate::fetcher::{ResilientFetcher, RetryPolicy};
    use crate::market::{Interval, MarketData, Period, PriceBar, PriceSeries};
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::Arc;

    /// Provider with fixed, plausible payloads
    pub struct FixedMarket {
        pub closes: Vec<f64>,
    }

    #[async_trait]
    impl MarketData for FixedMarket {
        async fn news(&self, symbol: &str) -> Result<Value> {
            Ok(json!({
                "symbol": symbol,
                "articles": [{"title": "Record quarter", "link": "https://example.com/a"}]
            }))
        }

        async fn price_history(&self, symbol: &str, period: Period, interval: Interval) -> Result<Value> {
            let bars = self
                .closes
                .iter()
                .enumerate()
                .map(|(i, &close)| PriceBar {
                    date: format!("2025-02-{:02}", i % 28 + 1),
                    open: close,
                    high: close,
                    low: close,
                    close,
                    volume: 10,
                })
                .collect();
            Ok(serde_json::to_value(PriceSeries {
                symbol: symbol.to_string(),
                period,
                interval,
                bars,
            })?)
        }

        async fn income_statement(&self, symbol: &str) -> Result<Value> {
            Ok(json!({"symbol": symbol, "annualReports": [
                {"fiscalDateEnding": "2024-12-31", "totalRevenue": "120", "netIncome": "12"},
                {"fiscalDateEnding": "2023-12-31", "totalRevenue": "100", "netIncome": "10"}
            ]}))
        }

        async fn balance_sheet(&self, symbol: &str) -> Result<Value> {
            Ok(json!({"symbol": symbol, "annualReports": [
                {"fiscalDateEnding": "2024-12-31", "totalShareholderEquity": "60",
                 "totalLiabilities": "30", "commonStockSharesOutstanding": "4"},
                {"fiscalDateEnding": "2023-12-31", "totalShareholderEquity": "50",
                 "totalLiabilities": "30", "commonStockSharesOutstanding": "4"}
            ]}))
        }

        async fn insider_transactions(&self, symbol: &str) -> Result<Value> {
            Ok(json!({"symbol": symbol, "transactions": []}))
        }
    }

    pub fn fetcher(closes: Vec<f64>) -> Arc<ResilientFetcher> {
        Arc::new(ResilientFetcher::new(
            Arc::new(FixedMarket { closes }),
            RetryPolicy::no_retry(),
        ))
    }

    pub fn rising(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64).collect()
    }
}
