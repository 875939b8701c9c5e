//! Alpha Vantage client: news sentiment, statements and insider activity

use crate::error::{ResearchError, Result};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde_json::{Value, json};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const BASE_URL: &str = "https://www.alphavantage.co/query";
const PROVIDER: &str = "alpha_vantage";
const NEWS_LIMIT: usize = 12;
const INSIDER_LIMIT: usize = 25;
const REPORTS_KEPT: usize = 4;

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Throttled Alpha Vantage client
///
/// The limiter is shared between clones so concurrent stages respect one
/// quota.
#[derive(Debug, Clone)]
pub struct AlphaVantageClient {
    client: Client,
    api_key: String,
    base_url: String,
    rate_limiter: SharedRateLimiter,
}

impl AlphaVantageClient {
    /// `rate_limit` is requests per minute; 0 falls back to the free tier's 5
    pub fn new(api_key: impl Into<String>, rate_limit: u32, timeout: Duration) -> Result<Self> {
        let per_minute = NonZeroU32::new(rate_limit).unwrap_or(NonZeroU32::MIN.saturating_add(4));
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: BASE_URL.to_string(),
            rate_limiter: Arc::new(RateLimiter::direct(Quota::per_minute(per_minute))),
        })
    }

    async fn query(&self, function: &str, symbol: &str, extra: &[(&str, &str)]) -> Result<Value> {
        self.rate_limiter.until_ready().await;

        let mut params: Vec<(&str, &str)> = vec![("function", function), ("apikey", self.api_key.as_str())];
        params.extend_from_slice(extra);
        if !extra.iter().any(|(k, _)| *k == "tickers") {
            params.push(("symbol", symbol));
        }

        let response = self.client.get(&self.base_url).query(&params).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ResearchError::from_provider(
                PROVIDER,
                symbol,
                function,
                format!("HTTP {status}: {body}"),
            ));
        }

        let data: Value = response.json().await?;
        check_payload(symbol, function, data)
    }

    /// Latest news with per-article sentiment
    pub async fn news(&self, symbol: &str) -> Result<Value> {
        let limit = NEWS_LIMIT.to_string();
        let data = self
            .query(
                "NEWS_SENTIMENT",
                symbol,
                &[("tickers", symbol), ("sort", "LATEST"), ("limit", &limit)],
            )
            .await?;
        debug!(symbol, "news fetched");
        Ok(summarize_news(symbol, &data))
    }

    pub async fn income_statement(&self, symbol: &str) -> Result<Value> {
        let data = self.query("INCOME_STATEMENT", symbol, &[]).await?;
        Ok(trim_reports(data))
    }

    pub async fn balance_sheet(&self, symbol: &str) -> Result<Value> {
        let data = self.query("BALANCE_SHEET", symbol, &[]).await?;
        Ok(trim_reports(data))
    }

    pub async fn insider_transactions(&self, symbol: &str) -> Result<Value> {
        let data = self.query("INSIDER_TRANSACTIONS", symbol, &[]).await?;
        let mut rows = data
            .get("data")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        rows.truncate(INSIDER_LIMIT);
        Ok(json!({"symbol": symbol, "transactions": rows}))
    }
}

/// Surface Alpha Vantage's in-band errors
///
/// Throttling arrives as HTTP 200 with a `Note` or `Information` field, but
/// so do premium-endpoint and plan notices; only throttling is retryable.
fn check_payload(symbol: &str, function: &str, data: Value) -> Result<Value> {
    if let Some(message) = data.get("Error Message").and_then(Value::as_str) {
        return Err(ResearchError::Fetch {
            symbol: symbol.to_string(),
            request: function.to_string(),
            reason: message.to_string(),
        });
    }

    for key in ["Note", "Information"] {
        if let Some(message) = data.get(key).and_then(Value::as_str) {
            return Err(ResearchError::from_provider(PROVIDER, symbol, function, message));
        }
    }

    if data.as_object().is_none_or(serde_json::Map::is_empty) {
        return Err(ResearchError::Fetch {
            symbol: symbol.to_string(),
            request: function.to_string(),
            reason: "empty response".to_string(),
        });
    }

    Ok(data)
}

/// Keep the fields a reader needs from each article
fn summarize_news(symbol: &str, data: &Value) -> Value {
    let articles: Vec<Value> = data
        .get("feed")
        .and_then(Value::as_array)
        .map(|feed| {
            feed.iter()
                .take(NEWS_LIMIT)
                .map(|item| {
                    let ticker_score = item
                        .get("ticker_sentiment")
                        .and_then(Value::as_array)
                        .and_then(|ts| {
                            ts.iter().find(|t| {
                                t.get("ticker")
                                    .and_then(Value::as_str)
                                    .is_some_and(|s| s.eq_ignore_ascii_case(symbol))
                            })
                        })
                        .and_then(|t| t.get("ticker_sentiment_score"))
                        .cloned()
                        .unwrap_or(Value::Null);

                    json!({
                        "title": item.get("title").cloned().unwrap_or(Value::Null),
                        "link": item.get("url").cloned().unwrap_or(Value::Null),
                        "source": item.get("source").cloned().unwrap_or(Value::Null),
                        "published": item.get("time_published").cloned().unwrap_or(Value::Null),
                        "summary": item.get("summary").cloned().unwrap_or(Value::Null),
                        "overall_sentiment_score": item.get("overall_sentiment_score").cloned().unwrap_or(Value::Null),
                        "overall_sentiment_label": item.get("overall_sentiment_label").cloned().unwrap_or(Value::Null),
                        "ticker_sentiment_score": ticker_score,
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    json!({"symbol": symbol, "articles": articles})
}

/// Keep only the most recent statements of each kind
fn trim_reports(mut data: Value) -> Value {
    for key in ["annualReports", "quarterlyReports"] {
        if let Some(reports) = data.get_mut(key).and_then(Value::as_array_mut) {
            reports.truncate(REPORTS_KEPT);
        }
    }
    data
}
