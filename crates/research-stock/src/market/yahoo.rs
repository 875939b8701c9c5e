//! Yahoo Finance price history

use crate::error::{ResearchError, Result};
use crate::market::{Interval, Period, PriceBar, PriceSeries};
use chrono::DateTime;
use tracing::debug;
use yahoo_finance_api as yahoo;

const PROVIDER: &str = "yahoo";

/// OHLCV history from Yahoo Finance; no API key required
#[derive(Debug, Clone, Default)]
pub struct YahooFinanceClient;

impl YahooFinanceClient {
    pub fn new() -> Self {
        Self
    }

    /// Fetch `period` of history at `interval` bars
    pub async fn price_series(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<PriceSeries> {
        let request = format!("price_history {period}/{interval}");
        let fail = |e: yahoo::YahooError| {
            ResearchError::from_provider(PROVIDER, symbol, &request, e.to_string())
        };

        let connector = yahoo::YahooConnector::new().map_err(fail)?;
        let response = connector
            .get_quote_range(symbol, interval.as_str(), period.as_str())
            .await
            .map_err(fail)?;
        let quotes = response.quotes().map_err(fail)?;

        let bars = to_bars(quotes.iter().map(|q| {
            (
                q.timestamp as i64,
                q.open,
                q.high,
                q.low,
                q.close,
                q.volume,
            )
        }));
        debug!(symbol, %period, %interval, bars = bars.len(), "price history fetched");

        Ok(PriceSeries {
            symbol: symbol.to_string(),
            period,
            interval,
            bars,
        })
    }
}

/// Convert raw quote tuples to bars, dropping bars without a usable close
fn to_bars(quotes: impl Iterator<Item = (i64, f64, f64, f64, f64, u64)>) -> Vec<PriceBar> {
    quotes
        .filter(|(_, _, _, _, close, _)| close.is_finite() && *close > 0.0)
        .filter_map(|(ts, open, high, low, close, volume)| {
            let date = DateTime::from_timestamp(ts, 0)?.format("%Y-%m-%d").to_string();
            Some(PriceBar {
                date,
                open,
                high,
                low,
                close,
                volume,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bars_without_close_are_skipped() {
        let raw = vec![
            (1_735_776_000, 1.0, 2.0, 0.5, 1.5, 100),
            (1_735_862_400, 1.5, 2.0, 1.0, f64::NAN, 0),
            (1_735_948_800, 1.5, 2.0, 1.0, 0.0, 0),
            (1_736_208_000, 1.6, 2.2, 1.2, 1.9, 120),
        ];

        let bars = to_bars(raw.into_iter());
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, "2025-01-02");
        assert_eq!(bars[1].close, 1.9);
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_price_series_live() {
        let series = YahooFinanceClient::new()
            .price_series("AAPL", Period::OneMonth, Interval::Daily)
            .await
            .unwrap();
        assert!(!series.is_empty());
    }
}
