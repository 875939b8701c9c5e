//! Shared fixtures for pipeline integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use research_core::AgentTask;
use research_runtime::ReasoningEngine;
use research_stock::{
    DecisionRecord, Interval, MarketData, Period, PriceBar, PriceSeries, RecommendationStore,
    ResearchError, Result,
};
use research_tools::ToolRegistry;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Market data with fixed closes, call counting and scripted news throttling
pub struct StubMarket {
    closes: Vec<f64>,
    news_rate_limits: AtomicU32,
    pub calls: AtomicUsize,
    pub news_calls: AtomicUsize,
}

impl StubMarket {
    pub fn new(closes: Vec<f64>) -> Self {
        Self {
            closes,
            news_rate_limits: AtomicU32::new(0),
            calls: AtomicUsize::new(0),
            news_calls: AtomicUsize::new(0),
        }
    }

    /// Answer the first `n` news calls with a rate-limit error
    pub fn with_news_rate_limits(self, n: u32) -> Self {
        self.news_rate_limits.store(n, Ordering::SeqCst);
        self
    }

    pub fn total_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// `n` strictly increasing closes
pub fn rising(n: usize) -> Vec<f64> {
    (0..n).map(|i| 100.0 + i as f64).collect()
}

#[async_trait]
impl MarketData for StubMarket {
    async fn news(&self, symbol: &str) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.news_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.news_rate_limits.load(Ordering::SeqCst);
        if remaining > 0 {
            self.news_rate_limits.store(remaining - 1, Ordering::SeqCst);
            return Err(ResearchError::from_provider(
                "alpha_vantage",
                symbol,
                "news",
                "429 Too Many Requests",
            ));
        }
        Ok(json!({
            "symbol": symbol,
            "articles": [
                {"title": "Record quarter", "link": "https://example.com/record"},
                {"title": "Supplier delays", "link": "https://example.com/delays"}
            ]
        }))
    }

    async fn price_history(&self, symbol: &str, period: Period, interval: Interval) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let bars = self
            .closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                date: format!("2025-03-{:02}", i % 28 + 1),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1_000,
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
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({
            "symbol": symbol,
            "annualReports": [
                {"fiscalDateEnding": "2024-12-31", "totalRevenue": "1100", "netIncome": "110"},
                {"fiscalDateEnding": "2023-12-31", "totalRevenue": "1000", "netIncome": "100"}
            ]
        }))
    }

    async fn balance_sheet(&self, symbol: &str) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({
            "symbol": symbol,
            "annualReports": [
                {"fiscalDateEnding": "2024-12-31", "totalShareholderEquity": "550",
                 "totalLiabilities": "275", "commonStockSharesOutstanding": "10"},
                {"fiscalDateEnding": "2023-12-31", "totalShareholderEquity": "500",
                 "totalLiabilities": "250", "commonStockSharesOutstanding": "10"}
            ]
        }))
    }

    async fn insider_transactions(&self, symbol: &str) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({"symbol": symbol, "transactions": []}))
    }
}

/// Engine that derives schema-conforming answers from the task context
///
/// The technical answer echoes the computed snapshot, so tests can observe
/// indicator values end to end.
#[derive(Default)]
pub struct EchoEngine {
    /// Stage whose answer should omit a required field
    pub broken_stage: Option<&'static str>,
    pub tasks: Mutex<Vec<AgentTask>>,
}

impl EchoEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn breaking(stage: &'static str) -> Self {
        Self {
            broken_stage: Some(stage),
            ..Self::default()
        }
    }

    pub fn task_names(&self) -> Vec<String> {
        self.tasks
            .lock()
            .unwrap()
            .iter()
            .map(|t| t.name.clone())
            .collect()
    }

    fn answer(task: &AgentTask) -> Value {
        let ctx = &task.context;
        let symbol = task.subject.clone();
        match task.name.as_str() {
            "news" => json!({
                "symbol": symbol,
                "sentiment_score": 0.4,
                "top_headlines": [{
                    "title": ctx["news"]["articles"][0]["title"],
                    "link": ctx["news"]["articles"][0]["link"],
                    "sentiment": "pos"
                }]
            }),
            "technical" => {
                let snapshot = &ctx["snapshot"];
                json!({
                    "symbol": symbol,
                    "rsi": snapshot["rsi"].as_f64().unwrap_or(50.0),
                    "macd": {
                        "hist": snapshot["macd"]["hist"].as_f64().unwrap_or(0.0),
                        "signal": snapshot["macd"]["signal"].as_f64().unwrap_or(0.0)
                    },
                    "support_levels": snapshot["support_levels"],
                    "resistance_levels": snapshot["resistance_levels"],
                    "trend": snapshot["trend"]
                })
            }
            "fundamental" => {
                let m = &ctx["metrics"];
                json!({
                    "symbol": symbol,
                    "revenue_yoy": m["revenue_yoy"].as_f64().unwrap_or(0.0),
                    "eps_yoy": m["eps_yoy"].as_f64().unwrap_or(0.0),
                    "roe": m["roe"].as_f64().unwrap_or(0.0),
                    "debt_to_equity": m["debt_to_equity"].as_f64().unwrap_or(0.0),
                    "cash_flow": m["cash_flow"].as_f64().unwrap_or(0.0)
                })
            }
            _ => {
                let up = ctx["technical"]["trend"] == "up";
                json!({
                    "symbol": symbol,
                    "recommendation": if up { "BUY" } else { "HOLD" },
                    "report": format!(
                        "Trend is {} with RSI {}.",
                        ctx["technical"]["trend"], ctx["technical"]["rsi"]
                    ),
                    "score": if up { 72 } else { 50 }
                })
            }
        }
    }
}

#[async_trait]
impl ReasoningEngine for EchoEngine {
    async fn run(
        &self,
        task: AgentTask,
        _tools: Arc<ToolRegistry>,
    ) -> research_core::Result<String> {
        let mut answer = Self::answer(&task);
        if self.broken_stage == Some(task.name.as_str()) {
            if let Some(fields) = answer.as_object_mut() {
                let first_required = match task.name.as_str() {
                    "news" => "sentiment_score",
                    "technical" => "trend",
                    "fundamental" => "roe",
                    _ => "score",
                };
                fields.remove(first_required);
            }
        }
        self.tasks.lock().unwrap().push(task);
        Ok(answer.to_string())
    }
}

/// Store that always fails
pub struct FailingStore;

#[async_trait]
impl RecommendationStore for FailingStore {
    async fn insert(&self, _record: &DecisionRecord) -> Result<()> {
        Err(ResearchError::Persistence("connection refused".to_string()))
    }
}
