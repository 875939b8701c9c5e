//! Price history tool

use super::{PriceParams, parse_params, tool_error};
use crate::fetcher::ResilientFetcher;
use crate::market::{Interval, Period};
use async_trait::async_trait;
use research_core::Result as CoreResult;
use research_llm::tools::schema;
use research_tools::Tool;
use serde_json::{Value, json};
use std::sync::Arc;

const NAME: &str = "stock_price";

/// Input schema shared by every tool that reads a price window
pub(crate) fn price_window_schema() -> Value {
    let periods: Vec<&str> = Period::ALL.iter().map(|p| p.as_str()).collect();
    let intervals: Vec<&str> = Interval::ALL.iter().map(|i| i.as_str()).collect();
    schema::object(
        json!({
            "symbol": schema::string("Stock ticker symbol (e.g. AAPL)"),
            "period": schema::enumeration("Lookback window, default 3mo", &periods),
            "interval": schema::enumeration("Bar size, default 1d", &intervals),
        }),
        &["symbol"],
    )
}

/// OHLCV history for a ticker
pub struct StockPriceTool {
    fetcher: Arc<ResilientFetcher>,
}

impl StockPriceTool {
    pub fn new(fetcher: Arc<ResilientFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Tool for StockPriceTool {
    async fn execute(&self, params: Value) -> CoreResult<Value> {
        let params: PriceParams = parse_params(NAME, params)?;
        let series = self
            .fetcher
            .price_series(&params.symbol, params.period, params.interval)
            .await
            .map_err(tool_error(NAME))?;

        serde_json::to_value(series).map_err(|e| research_core::Error::tool_failed(NAME, e))
    }

    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Fetch daily, weekly or monthly OHLCV price history for a stock \
         over 1mo, 3mo, 6mo, 1y, 2y or 5y."
    }

    fn input_schema(&self) -> Value {
        price_window_schema()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{fetcher, rising};

    #[tokio::test]
    async fn test_price_tool() {
        let tool = StockPriceTool::new(fetcher(rising(3)));
        let out = tool
            .execute(json!({"symbol": "msft", "period": "1y", "interval": "1wk"}))
            .await
            .unwrap();
        assert_eq!(out["symbol"], "MSFT");
        assert_eq!(out["period"], "1y");
        assert_eq!(out["interval"], "1wk");
        assert_eq!(out["bars"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_price_tool_rejects_unknown_period() {
        let tool = StockPriceTool::new(fetcher(rising(3)));
        let err = tool
            .execute(json!({"symbol": "MSFT", "period": "7d"}))
            .await
            .unwrap_err();
        assert!(matches!(err, research_core::Error::InvalidToolInput { .. }));
    }

    #[test]
    fn test_schema_lists_windows() {
        let schema = price_window_schema();
        assert_eq!(schema["properties"]["period"]["enum"].as_array().unwrap().len(), 6);
        assert_eq!(schema["required"], json!(["symbol"]));
    }
}
