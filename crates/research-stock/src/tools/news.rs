//! News tool

use super::{parse_params, tool_error};
use crate::fetcher::{FetchRequest, ResilientFetcher};
use async_trait::async_trait;
use research_core::Result as CoreResult;
use research_llm::tools::schema;
use research_tools::Tool;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

const NAME: &str = "stock_news";

/// Recent news with provider sentiment for a ticker
pub struct StockNewsTool {
    fetcher: Arc<ResilientFetcher>,
}

#[derive(Debug, Deserialize)]
struct NewsParams {
    symbol: String,
}

impl StockNewsTool {
    pub fn new(fetcher: Arc<ResilientFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Tool for StockNewsTool {
    async fn execute(&self, params: Value) -> CoreResult<Value> {
        let params: NewsParams = parse_params(NAME, params)?;
        self.fetcher
            .fetch(&params.symbol, FetchRequest::News)
            .await
            .map_err(tool_error(NAME))
    }

    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Fetch the latest news articles about a stock, with titles, links, \
         summaries and provider sentiment scores."
    }

    fn input_schema(&self) -> Value {
        schema::object(
            json!({"symbol": schema::string("Stock ticker symbol (e.g. AAPL)")}),
            &["symbol"],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::fetcher;

    #[tokio::test]
    async fn test_news_tool() {
        let tool = StockNewsTool::new(fetcher(vec![]));
        let out = tool.execute(json!({"symbol": "aapl"})).await.unwrap();
        assert_eq!(out["symbol"], "AAPL");
        assert!(out["articles"].is_array());
    }

    #[tokio::test]
    async fn test_news_tool_rejects_blank_symbol() {
        let tool = StockNewsTool::new(fetcher(vec![]));
        let err = tool.execute(json!({"symbol": " "})).await.unwrap_err();
        assert!(matches!(err, research_core::Error::ToolFailed { .. }));

        let err = tool.execute(json!({})).await.unwrap_err();
        assert!(matches!(err, research_core::Error::InvalidToolInput { .. }));
    }
}
