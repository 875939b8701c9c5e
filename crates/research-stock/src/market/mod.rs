//! Market data providers
//!
//! [`MarketData`] is the provider seam used by the resilient fetcher. Every
//! method returns the provider's payload as JSON; price history payloads
//! deserialize into [`PriceSeries`].

pub mod alpha_vantage;
pub mod client;
pub mod yahoo;

pub use alpha_vantage::AlphaVantageClient;
pub use client::MarketDataClient;
pub use yahoo::YahooFinanceClient;

use crate::error::{ResearchError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Source of raw market data, keyed by ticker symbol
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Recent news items
    async fn news(&self, symbol: &str) -> Result<Value>;

    /// OHLCV history serialized as a [`PriceSeries`]
    async fn price_history(&self, symbol: &str, period: Period, interval: Interval) -> Result<Value>;

    /// Annual and quarterly income statements
    async fn income_statement(&self, symbol: &str) -> Result<Value>;

    /// Annual and quarterly balance sheets
    async fn balance_sheet(&self, symbol: &str) -> Result<Value>;

    /// Recent insider transactions
    async fn insider_transactions(&self, symbol: &str) -> Result<Value>;
}

/// Lookback window of a price request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1mo")]
    OneMonth,
    #[default]
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
}

impl Period {
    pub const ALL: [Self; 6] = [
        Self::OneMonth,
        Self::ThreeMonths,
        Self::SixMonths,
        Self::OneYear,
        Self::TwoYears,
        Self::FiveYears,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneMonth => "1mo",
            Self::ThreeMonths => "3mo",
            Self::SixMonths => "6mo",
            Self::OneYear => "1y",
            Self::TwoYears => "2y",
            Self::FiveYears => "5y",
        }
    }
}

/// Bar size of a price request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[default]
    #[serde(rename = "1d")]
    Daily,
    #[serde(rename = "1wk")]
    Weekly,
    #[serde(rename = "1mo")]
    Monthly,
}

impl Interval {
    pub const ALL: [Self; 3] = [Self::Daily, Self::Weekly, Self::Monthly];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "1d",
            Self::Weekly => "1wk",
            Self::Monthly => "1mo",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = ResearchError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s.trim())
            .ok_or_else(|| {
                ResearchError::MalformedInput(format!(
                    "unsupported period '{s}' (expected one of 1mo, 3mo, 6mo, 1y, 2y, 5y)"
                ))
            })
    }
}

impl FromStr for Interval {
    type Err = ResearchError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|i| i.as_str() == s.trim())
            .ok_or_else(|| {
                ResearchError::MalformedInput(format!(
                    "unsupported interval '{s}' (expected one of 1d, 1wk, 1mo)"
                ))
            })
    }
}

/// One OHLCV bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    /// Bar date, `YYYY-MM-DD`
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Ordered OHLCV history, oldest bar first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub symbol: String,
    pub period: Period,
    pub interval: Interval,
    pub bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn dates(&self) -> Vec<&str> {
        self.bars.iter().map(|b| b.date.as_str()).collect()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.bars.last().map(|b| b.close)
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}
