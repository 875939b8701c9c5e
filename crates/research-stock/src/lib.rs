//! Equity research pipeline
//!
//! Turns a ticker symbol into a BUY/SELL/HOLD decision record:
//!
//! - Market data from Yahoo Finance (prices) and Alpha Vantage (news,
//!   statements, insider activity), behind a retry-hardened fetcher
//! - Technical indicators (RSI, MACD, Bollinger Bands) plus derived support,
//!   resistance and trend
//! - Four schema-checked analysis stages (news, technical, fundamental,
//!   synthesis), each delegated to a [`ReasoningEngine`] with its own tools
//! - Append-only persistence of the final record (Postgres or in memory)
//!
//! # Example
//!
//! ```rust,ignore
//! use research_stock::{ResearchConfig, ResearchPipeline};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ResearchConfig::from_env()?;
//!     let pipeline = ResearchPipeline::from_config(&config).await?;
//!
//!     let run = pipeline.execute("AAPL").await?;
//!     println!("{} ({})", run.record.recommendation, run.record.score);
//!     Ok(())
//! }
//! ```
//!
//! [`ReasoningEngine`]: research_runtime::ReasoningEngine

pub mod analysis;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod indicators;
pub mod market;
pub mod pipeline;
pub mod schema;
pub mod stages;
pub mod store;
pub mod tools;

pub use config::{ReportLanguage, ResearchConfig};
pub use error::{ResearchError, Result};
pub use fetcher::{FetchRequest, ResilientFetcher, RetryPolicy, normalize_symbol};
pub use market::{Interval, MarketData, MarketDataClient, Period, PriceBar, PriceSeries};
pub use pipeline::{PipelineRun, ResearchPipeline, RunState};
pub use schema::{
    FundamentalReport, NewsReport, Recommendation, StageKind, StageOutput, TechnicalReport,
    Verdict,
};
pub use stages::{AnalysisStage, StageContext};
pub use store::{DecisionRecord, MemoryStore, PgRecommendationStore, RecommendationStore};
