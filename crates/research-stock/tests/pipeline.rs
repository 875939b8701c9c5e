//! End-to-end pipeline runs over stub market data and a stub engine

mod common;

use common::{EchoEngine, FailingStore, StubMarket, rising};
use research_stock::{
    MemoryStore, RecommendationStore, ResearchConfig, ResearchError, ResearchPipeline,
    ResilientFetcher, RunState, StageKind, Verdict,
};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::time::Instant;

fn config(parallel: bool) -> ResearchConfig {
    ResearchConfig::builder()
        .fetch_retries(3)
        .retry_base_delay(Duration::from_secs(1))
        .retry_jitter(Duration::ZERO)
        .parallel_stages(parallel)
        .build()
        .unwrap()
}

fn pipeline(
    config: &ResearchConfig,
    market: Arc<StubMarket>,
    engine: Arc<EchoEngine>,
    store: Arc<dyn RecommendationStore>,
) -> ResearchPipeline {
    let fetcher = Arc::new(ResilientFetcher::new(market, config.retry_policy()));
    ResearchPipeline::standard(config, engine, fetcher, store).unwrap()
}

#[tokio::test]
async fn test_rising_closes_end_to_end() {
    let market = Arc::new(StubMarket::new(rising(30)));
    let engine = Arc::new(EchoEngine::new());
    let store = Arc::new(MemoryStore::new());
    let pipeline = pipeline(&config(true), market, engine.clone(), store.clone());

    let run = pipeline.execute("aapl").await.unwrap();

    assert_eq!(run.technical.symbol, "AAPL");
    assert!((run.technical.rsi - 100.0).abs() < 1e-9);
    assert_eq!(run.technical.trend.to_string(), "up");
    assert_eq!(run.news.top_headlines[0].title, "Record quarter");
    assert!((run.fundamental.revenue_yoy - 10.0).abs() < 1e-9);

    assert_eq!(run.record.recommendation, Verdict::Buy);
    assert!((0.0..=100.0).contains(&run.record.score));
    assert!(run.persisted);
    assert_eq!(run.state, RunState::Persisted);

    let records = store.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0], run.record);

    let names = engine.task_names();
    assert_eq!(names.len(), 4);
    assert_eq!(names[3], "recommendation");
}

#[tokio::test(start_paused = true)]
async fn test_news_rate_limited_twice_then_succeeds() {
    let market = Arc::new(StubMarket::new(rising(40)).with_news_rate_limits(2));
    let store = Arc::new(MemoryStore::new());
    let pipeline = pipeline(
        &config(false),
        market.clone(),
        Arc::new(EchoEngine::new()),
        store.clone(),
    );

    let started = Instant::now();
    let run = pipeline.execute("AAPL").await.unwrap();

    assert_eq!(market.news_calls.load(Ordering::SeqCst), 3);
    // 1s + 2s of backoff with no jitter
    assert!(started.elapsed() >= Duration::from_secs(3));
    assert_eq!(run.news.top_headlines.len(), 1);
    assert_eq!(store.records().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_exhaustion_aborts_run() {
    let market = Arc::new(StubMarket::new(rising(40)).with_news_rate_limits(5));
    let engine = Arc::new(EchoEngine::new());
    let store = Arc::new(MemoryStore::new());
    let pipeline = pipeline(&config(false), market.clone(), engine.clone(), store.clone());

    let err = pipeline.execute("AAPL").await.unwrap_err();

    assert!(err.is_rate_limited());
    assert_eq!(market.news_calls.load(Ordering::SeqCst), 3);
    assert!(engine.task_names().is_empty());
    assert!(store.records().is_empty());
}

#[tokio::test]
async fn test_missing_symbol_fetches_nothing() {
    let market = Arc::new(StubMarket::new(rising(30)));
    let engine = Arc::new(EchoEngine::new());
    let store = Arc::new(MemoryStore::new());
    let pipeline = pipeline(&config(true), market.clone(), engine.clone(), store.clone());

    for symbol in ["", "   "] {
        let err = pipeline.execute(symbol).await.unwrap_err();
        assert!(matches!(err, ResearchError::MalformedInput(_)));
    }

    assert_eq!(market.total_calls(), 0);
    assert!(engine.task_names().is_empty());
    assert!(store.records().is_empty());
}

#[tokio::test]
async fn test_missing_field_stops_before_synthesis() {
    let market = Arc::new(StubMarket::new(rising(30)));
    let engine = Arc::new(EchoEngine::breaking("technical"));
    let store = Arc::new(MemoryStore::new());
    let pipeline = pipeline(&config(false), market, engine.clone(), store.clone());

    let err = pipeline.execute("AAPL").await.unwrap_err();

    assert!(matches!(
        err,
        ResearchError::SchemaValidation {
            stage: StageKind::Technical,
            ..
        }
    ));
    assert!(!engine.task_names().contains(&"recommendation".to_string()));
    assert!(store.records().is_empty());
}

#[tokio::test]
async fn test_invalid_recommendation_is_not_persisted() {
    let market = Arc::new(StubMarket::new(rising(30)));
    let store = Arc::new(MemoryStore::new());
    let pipeline = pipeline(
        &config(true),
        market,
        Arc::new(EchoEngine::breaking("recommendation")),
        store.clone(),
    );

    let err = pipeline.execute("AAPL").await.unwrap_err();
    assert_eq!(err.stage(), Some(StageKind::Recommendation));
    assert!(store.records().is_empty());
}

#[tokio::test]
async fn test_rerun_appends() {
    let store = Arc::new(MemoryStore::new());
    let pipeline = pipeline(
        &config(true),
        Arc::new(StubMarket::new(rising(30))),
        Arc::new(EchoEngine::new()),
        store.clone(),
    );

    let first = pipeline.execute("AAPL").await.unwrap();
    let second = pipeline.execute("AAPL").await.unwrap();

    assert_ne!(first.run_id, second.run_id);
    let records = store.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0], first.record);
    assert_eq!(records[1], second.record);
}

#[tokio::test]
async fn test_persistence_failure_keeps_result() {
    let pipeline = pipeline(
        &config(true),
        Arc::new(StubMarket::new(rising(30))),
        Arc::new(EchoEngine::new()),
        Arc::new(FailingStore),
    );

    let run = pipeline.execute("AAPL").await.unwrap();
    assert!(!run.persisted);
    assert_eq!(run.state, RunState::Synthesized);
    assert_eq!(run.record.recommendation, Verdict::Buy);
}
