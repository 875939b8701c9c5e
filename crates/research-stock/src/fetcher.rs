//! Resilient data fetching
//!
//! Every provider call made by the pipeline goes through
//! [`ResilientFetcher::fetch`], which normalises the symbol and applies one
//! [`RetryPolicy`]: rate-limited calls are retried with exponential backoff
//! plus jitter, anything else fails immediately.

use crate::error::{ResearchError, Result};
use crate::market::{Interval, MarketData, Period, PriceSeries};
use rand::Rng;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

/// Kind of provider request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchRequest {
    News,
    PriceHistory { period: Period, interval: Interval },
    IncomeStatement,
    BalanceSheet,
    InsiderTransactions,
}

impl fmt::Display for FetchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::News => f.write_str("news"),
            Self::PriceHistory { period, interval } => {
                write!(f, "price_history({period}, {interval})")
            }
            Self::IncomeStatement => f.write_str("income_statement"),
            Self::BalanceSheet => f.write_str("balance_sheet"),
            Self::InsiderTransactions => f.write_str("insider_transactions"),
        }
    }
}

/// Backoff policy for rate-limited calls
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, first call included
    pub retries: u32,

    /// Delay after the first failed attempt; doubles each time
    pub base_delay: Duration,

    /// Upper bound of the uniform random delay added to each backoff
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            base_delay: Duration::from_secs(1),
            jitter: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// `jitter` is capped at `base_delay` so delays never shrink between attempts
    pub fn new(retries: u32, base_delay: Duration, jitter: Duration) -> Self {
        Self {
            retries,
            base_delay,
            jitter: jitter.min(base_delay),
        }
    }

    /// Single attempt, no waiting
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// Delay after failed attempt `attempt` (0-based)
    ///
    /// `base_delay * 2^attempt + jitter * sample`, with `sample` in `[0, 1)`.
    pub fn delay_for(&self, attempt: u32, sample: f64) -> Duration {
        let backoff = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        let sample = if sample.is_finite() {
            sample.clamp(0.0, 1.0)
        } else {
            0.0
        };
        backoff.saturating_add(self.jitter.mul_f64(sample))
    }

    /// Run `operation` until it succeeds, fails for a reason other than
    /// throttling, or runs out of attempts
    ///
    /// The error of the last attempt is returned unchanged.
    pub async fn execute<F, Fut, T>(&self, operation_name: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.retries.max(1);
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(operation = operation_name, attempt, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_rate_limited() => return Err(e),
                Err(e) if attempt + 1 >= attempts => {
                    warn!(operation = operation_name, attempts, error = %e, "retries exhausted");
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.delay_for(attempt, rand::thread_rng().r#gen::<f64>());
                    warn!(
                        operation = operation_name,
                        attempt = attempt + 1,
                        attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "rate limited, backing off"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Trim and upper-case a ticker; blank input is rejected
pub fn normalize_symbol(symbol: &str) -> Result<String> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(ResearchError::MalformedInput(
            "symbol must not be empty".to_string(),
        ));
    }
    Ok(symbol.to_uppercase())
}

/// Retry-hardened access to a [`MarketData`] provider
///
/// Holds no cache, so concurrent stages never share fetched state.
#[derive(Clone)]
pub struct ResilientFetcher {
    provider: Arc<dyn MarketData>,
    policy: RetryPolicy,
}

impl fmt::Debug for ResilientFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResilientFetcher")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl ResilientFetcher {
    pub fn new(provider: Arc<dyn MarketData>, policy: RetryPolicy) -> Self {
        Self { provider, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetch raw provider data for `symbol`
    #[instrument(skip(self, request), fields(request = %request))]
    pub async fn fetch(&self, symbol: &str, request: FetchRequest) -> Result<Value> {
        let symbol = normalize_symbol(symbol)?;
        let symbol = symbol.as_str();
        let operation = format!("{request} {symbol}");

        self.policy
            .execute(&operation, move || self.dispatch(symbol, request))
            .await
    }

    /// Typed price history
    pub async fn price_series(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<PriceSeries> {
        let request = FetchRequest::PriceHistory { period, interval };
        let raw = self.fetch(symbol, request).await?;
        serde_json::from_value(raw).map_err(|e| ResearchError::Fetch {
            symbol: symbol.trim().to_uppercase(),
            request: request.to_string(),
            reason: format!("unexpected price history payload: {e}"),
        })
    }

    async fn dispatch(&self, symbol: &str, request: FetchRequest) -> Result<Value> {
        match request {
            FetchRequest::News => self.provider.news(symbol).await,
            FetchRequest::PriceHistory { period, interval } => {
                self.provider.price_history(symbol, period, interval).await
            }
            FetchRequest::IncomeStatement => self.provider.income_statement(symbol).await,
            FetchRequest::BalanceSheet => self.provider.balance_sheet(symbol).await,
            FetchRequest::InsiderTransactions => self.provider.insider_transactions(symbol).await,
        }
    }
}
