//! Composite provider: Yahoo for prices, Alpha Vantage for everything else

use super::{AlphaVantageClient, Interval, MarketData, Period, YahooFinanceClient};
use crate::config::ResearchConfig;
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use tracing::instrument;

/// Live [`MarketData`] implementation
#[derive(Debug, Clone)]
pub struct MarketDataClient {
    yahoo: YahooFinanceClient,
    alpha_vantage: AlphaVantageClient,
}

impl MarketDataClient {
    pub fn new(yahoo: YahooFinanceClient, alpha_vantage: AlphaVantageClient) -> Self {
        Self {
            yahoo,
            alpha_vantage,
        }
    }

    pub fn from_config(config: &ResearchConfig) -> Result<Self> {
        let alpha_vantage = AlphaVantageClient::new(
            config.alpha_vantage_api_key.clone(),
            config.alpha_vantage_rate_limit,
            config.request_timeout,
        )?;
        Ok(Self::new(YahooFinanceClient::new(), alpha_vantage))
    }
}

#[async_trait]
impl MarketData for MarketDataClient {
    #[instrument(skip(self))]
    async fn news(&self, symbol: &str) -> Result<Value> {
        self.alpha_vantage.news(symbol).await
    }

    #[instrument(skip(self))]
    async fn price_history(&self, symbol: &str, period: Period, interval: Interval) -> Result<Value> {
        let series = self.yahoo.price_series(symbol, period, interval).await?;
        Ok(serde_json::to_value(series)?)
    }

    #[instrument(skip(self))]
    async fn income_statement(&self, symbol: &str) -> Result<Value> {
        self.alpha_vantage.income_statement(symbol).await
    }

    #[instrument(skip(self))]
    async fn balance_sheet(&self, symbol: &str) -> Result<Value> {
        self.alpha_vantage.balance_sheet(symbol).await
    }

    #[instrument(skip(self))]
    async fn insider_transactions(&self, symbol: &str) -> Result<Value> {
        self.alpha_vantage.insider_transactions(symbol).await
    }
}
