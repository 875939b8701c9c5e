//! Indicator tools
//!
//! Each tool fetches a price window and runs one calculation from
//! [`crate::indicators`] over its closes.

use super::price::price_window_schema;
use super::{PriceParams, parse_params, tool_error};
use crate::analysis::TechnicalSnapshot;
use crate::fetcher::ResilientFetcher;
use crate::indicators::{
    self, BOLLINGER_MULTIPLIER, BOLLINGER_PERIOD, MACD_FAST, MACD_SIGNAL, MACD_SLOW, RSI_LENGTH,
};
use crate::market::PriceSeries;
use async_trait::async_trait;
use research_core::Result as CoreResult;
use research_llm::tools::schema;
use research_tools::Tool;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

/// Values returned per indicator call; older rows are summarised away
const RECENT_ROWS: usize = 10;

#[derive(Debug, Deserialize)]
struct IndicatorParams {
    #[serde(flatten)]
    window: PriceParams,
    #[serde(default)]
    length: Option<usize>,
    #[serde(default)]
    fast: Option<usize>,
    #[serde(default)]
    slow: Option<usize>,
    #[serde(default)]
    signal: Option<usize>,
    #[serde(default)]
    multiplier: Option<f64>,
}

async fn load(fetcher: &ResilientFetcher, tool: &str, params: &PriceParams) -> CoreResult<PriceSeries> {
    fetcher
        .price_series(&params.symbol, params.period, params.interval)
        .await
        .map_err(tool_error(tool))
}

/// Last `RECENT_ROWS` values paired with their dates
fn recent<T: serde::Serialize>(series: &PriceSeries, values: &[T]) -> Value {
    let dates = series.dates();
    let offset = dates.len().saturating_sub(values.len());
    let start = values.len().saturating_sub(RECENT_ROWS);
    let rows: Vec<Value> = values[start..]
        .iter()
        .zip(&dates[offset + start..])
        .map(|(value, date)| json!({"date": date, "value": value}))
        .collect();
    Value::Array(rows)
}

fn with_params(extra: Value) -> Value {
    let mut input = price_window_schema();
    if let (Some(props), Some(extra)) = (input["properties"].as_object_mut(), extra.as_object()) {
        props.extend(extra.clone());
    }
    input
}

macro_rules! indicator_tool {
    ($ty:ident, $name:literal) => {
        pub struct $ty {
            fetcher: Arc<ResilientFetcher>,
        }

        impl $ty {
            const NAME: &'static str = $name;

            pub fn new(fetcher: Arc<ResilientFetcher>) -> Self {
                Self { fetcher }
            }
        }
    };
}

indicator_tool!(RsiTool, "rsi");
indicator_tool!(MacdTool, "macd");
indicator_tool!(BollingerTool, "bollinger_bands");
indicator_tool!(TechnicalSnapshotTool, "technical_snapshot");

#[async_trait]
impl Tool for RsiTool {
    async fn execute(&self, params: Value) -> CoreResult<Value> {
        let params: IndicatorParams = parse_params(Self::NAME, params)?;
        let length = params.length.unwrap_or(RSI_LENGTH);
        let series = load(&self.fetcher, Self::NAME, &params.window).await?;

        let values = indicators::rsi(&series.closes(), length).map_err(tool_error(Self::NAME))?;
        Ok(json!({
            "symbol": series.symbol,
            "length": length,
            "bars": series.len(),
            "current": values.last(),
            "recent": recent(&series, &values),
        }))
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Relative strength index (Wilder, default length 14) of a stock's closes. \
         Above 70 is overbought, below 30 oversold."
    }

    fn input_schema(&self) -> Value {
        with_params(json!({"length": schema::integer("RSI length, default 14")}))
    }
}

#[async_trait]
impl Tool for MacdTool {
    async fn execute(&self, params: Value) -> CoreResult<Value> {
        let params: IndicatorParams = parse_params(Self::NAME, params)?;
        let fast = params.fast.unwrap_or(MACD_FAST);
        let slow = params.slow.unwrap_or(MACD_SLOW);
        let signal = params.signal.unwrap_or(MACD_SIGNAL);
        let series = load(&self.fetcher, Self::NAME, &params.window).await?;

        let points = indicators::macd(&series.closes(), fast, slow, signal)
            .map_err(tool_error(Self::NAME))?;
        Ok(json!({
            "symbol": series.symbol,
            "fast": fast,
            "slow": slow,
            "signal": signal,
            "bars": series.len(),
            "current": points.last(),
            "recent": recent(&series, &points),
        }))
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "MACD line, signal line and histogram (default 12/26/9) of a stock's closes."
    }

    fn input_schema(&self) -> Value {
        with_params(json!({
            "fast": schema::integer("Fast EMA period, default 12"),
            "slow": schema::integer("Slow EMA period, default 26"),
            "signal": schema::integer("Signal EMA period, default 9"),
        }))
    }
}

#[async_trait]
impl Tool for BollingerTool {
    async fn execute(&self, params: Value) -> CoreResult<Value> {
        let params: IndicatorParams = parse_params(Self::NAME, params)?;
        let length = params.length.unwrap_or(BOLLINGER_PERIOD);
        let multiplier = params.multiplier.unwrap_or(BOLLINGER_MULTIPLIER);
        let series = load(&self.fetcher, Self::NAME, &params.window).await?;

        let bands = indicators::bollinger_bands(&series.closes(), length, multiplier)
            .map_err(tool_error(Self::NAME))?;
        Ok(json!({
            "symbol": series.symbol,
            "length": length,
            "multiplier": multiplier,
            "bars": series.len(),
            "last_close": series.last_close(),
            "current": bands.last(),
            "recent": recent(&series, &bands),
        }))
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Bollinger bands (default 20 bars, 2 standard deviations) of a stock's closes."
    }

    fn input_schema(&self) -> Value {
        with_params(json!({
            "length": schema::integer("Window length, default 20"),
            "multiplier": schema::number("Standard deviation multiplier, default 2"),
        }))
    }
}

#[async_trait]
impl Tool for TechnicalSnapshotTool {
    async fn execute(&self, params: Value) -> CoreResult<Value> {
        let params: PriceParams = parse_params(Self::NAME, params)?;
        let series = load(&self.fetcher, Self::NAME, &params).await?;
        let snapshot = TechnicalSnapshot::from_series(&series).map_err(tool_error(Self::NAME))?;
        serde_json::to_value(snapshot).map_err(|e| research_core::Error::tool_failed(Self::NAME, e))
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Latest RSI, MACD, Bollinger bands, support and resistance levels and \
         30-bar trend of a stock in one call."
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
    async fn test_rsi_tool_on_rising_closes() {
        let tool = RsiTool::new(fetcher(rising(30)));
        let out = tool.execute(json!({"symbol": "AAPL"})).await.unwrap();
        assert_eq!(out["current"], 100.0);
        assert_eq!(out["recent"].as_array().unwrap().len(), RECENT_ROWS);
    }

    #[tokio::test]
    async fn test_macd_tool_short_history_is_empty() {
        let tool = MacdTool::new(fetcher(rising(20)));
        let out = tool.execute(json!({"symbol": "AAPL"})).await.unwrap();
        assert!(out["current"].is_null());
        assert_eq!(out["recent"], json!([]));
    }

    #[tokio::test]
    async fn test_bollinger_tool_custom_params() {
        let tool = BollingerTool::new(fetcher(rising(12)));
        let out = tool
            .execute(json!({"symbol": "AAPL", "length": 5, "multiplier": 1.5}))
            .await
            .unwrap();
        assert_eq!(out["length"], 5);
        assert_eq!(out["recent"].as_array().unwrap().len(), 8);
        assert_eq!(out["recent"][7]["date"], "2025-02-12");
    }

    #[tokio::test]
    async fn test_invalid_indicator_params_fail_the_call() {
        let tool = MacdTool::new(fetcher(rising(40)));
        let err = tool
            .execute(json!({"symbol": "AAPL", "fast": 30, "slow": 10}))
            .await
            .unwrap_err();
        assert!(matches!(err, research_core::Error::ToolFailed { .. }));
    }

    #[tokio::test]
    async fn test_snapshot_tool() {
        let tool = TechnicalSnapshotTool::new(fetcher(rising(30)));
        let out = tool.execute(json!({"symbol": "aapl"})).await.unwrap();
        assert_eq!(out["symbol"], "AAPL");
        assert_eq!(out["rsi"], 100.0);
        assert_eq!(out["trend"], "up");
    }

    #[test]
    fn test_indicator_schema_extends_window() {
        let tool = MacdTool::new(fetcher(vec![]));
        let schema = tool.input_schema();
        assert!(schema["properties"]["fast"].is_object());
        assert!(schema["properties"]["period"].is_object());
    }
}
