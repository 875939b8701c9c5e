//! Pipeline orchestration
//!
//! ```text
//! news ───────┐
//! technical ──┼──▶ synthesis ──▶ store
//! fundamental ┘
//! ```
//!
//! The three independent stages run concurrently (or one after another when
//! `parallel_stages` is off); the first failure aborts the run. Synthesis
//! only starts once all three validated reports are in hand. A successful
//! run writes one [`DecisionRecord`]; a failed write is logged and surfaced
//! as `persisted: false`, never as an error.

use crate::config::ResearchConfig;
use crate::error::{ResearchError, Result};
use crate::fetcher::{ResilientFetcher, normalize_symbol};
use crate::market::MarketDataClient;
use crate::schema::{FundamentalReport, NewsReport, StageKind, StageOutput, TechnicalReport};
use crate::stages::{
    AnalysisStage, Delegate, FundamentalStage, NewsStage, StageContext, SynthesisStage,
    TechnicalStage,
};
use crate::store::{DecisionRecord, MemoryStore, PgRecommendationStore, RecommendationStore};
use research_llm::providers::{OpenAIConfig, OpenAIProvider};
use research_runtime::{ExecutorConfig, ReasoningEngine, ToolAgentEngine};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

/// Lifecycle of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "stage", rename_all = "snake_case")]
pub enum RunState {
    Pending,
    Running(StageKind),
    Synthesized,
    Persisted,
    Failed(StageKind),
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("PENDING"),
            Self::Running(stage) => write!(f, "RUNNING({stage})"),
            Self::Synthesized => f.write_str("SYNTHESIZED"),
            Self::Persisted => f.write_str("PERSISTED"),
            Self::Failed(stage) => write!(f, "FAILED({stage})"),
        }
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    pub run_id: Uuid,
    pub record: DecisionRecord,
    pub news: NewsReport,
    pub technical: TechnicalReport,
    pub fundamental: FundamentalReport,
    /// `Persisted`, or `Synthesized` when the store rejected the record
    pub state: RunState,
    pub persisted: bool,
}

/// Orchestrates the four stages and the final write
pub struct ResearchPipeline {
    news: Arc<dyn AnalysisStage>,
    technical: Arc<dyn AnalysisStage>,
    fundamental: Arc<dyn AnalysisStage>,
    synthesis: Arc<dyn AnalysisStage>,
    store: Arc<dyn RecommendationStore>,
    parallel: bool,
}

impl ResearchPipeline {
    /// Assemble a pipeline from arbitrary stage implementations
    pub fn new(
        news: Arc<dyn AnalysisStage>,
        technical: Arc<dyn AnalysisStage>,
        fundamental: Arc<dyn AnalysisStage>,
        synthesis: Arc<dyn AnalysisStage>,
        store: Arc<dyn RecommendationStore>,
    ) -> Self {
        Self {
            news,
            technical,
            fundamental,
            synthesis,
            store,
            parallel: true,
        }
    }

    /// Run the independent stages concurrently (default) or in order
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// The standard four stages over one engine and one fetcher
    pub fn standard(
        config: &ResearchConfig,
        engine: Arc<dyn ReasoningEngine>,
        fetcher: Arc<ResilientFetcher>,
        store: Arc<dyn RecommendationStore>,
    ) -> Result<Self> {
        let delegate = Delegate::new(engine, config.report_language);
        Ok(Self::new(
            Arc::new(NewsStage::new(
                delegate.clone(),
                fetcher.clone(),
                config.request_timeout,
            )?),
            Arc::new(TechnicalStage::new(delegate.clone(), fetcher.clone())),
            Arc::new(FundamentalStage::new(delegate.clone(), fetcher)),
            Arc::new(SynthesisStage::new(delegate)),
            store,
        )
        .with_parallel(config.parallel_stages))
    }

    /// Wire live providers, the OpenAI engine and the configured store
    ///
    /// Without a `database_url` records go to an in-memory store.
    pub async fn from_config(config: &ResearchConfig) -> Result<Self> {
        config.require_credentials()?;

        let market = MarketDataClient::from_config(config)?;
        let fetcher = Arc::new(ResilientFetcher::new(
            Arc::new(market),
            config.retry_policy(),
        ));

        let provider = OpenAIProvider::with_config(
            OpenAIConfig::new(config.openai_api_key.clone())
                .with_api_base(config.openai_api_base.clone())
                .with_timeout(config.request_timeout.as_secs().max(1) * 4),
        )
        .map_err(|e| ResearchError::Config(e.to_string()))?;
        let engine = Arc::new(ToolAgentEngine::new(
            Arc::new(provider),
            ExecutorConfig {
                max_iterations: config.max_iterations,
                model: config.model.clone(),
                max_tokens: config.max_tokens,
                temperature: Some(config.temperature),
            },
        ));

        let store: Arc<dyn RecommendationStore> = match &config.database_url {
            Some(url) => {
                let store = PgRecommendationStore::connect_lazy(url)?;
                if let Err(e) = store.ensure_schema().await {
                    warn!(error = %e, "could not prepare stock_recommendation table");
                }
                Arc::new(store)
            }
            None => {
                info!("DATABASE_URL not set, keeping decision records in memory");
                Arc::new(MemoryStore::new())
            }
        };

        Self::standard(config, engine, fetcher, store)
    }

    /// Research `symbol` end to end
    ///
    /// A blank symbol fails with [`ResearchError::MalformedInput`] before any
    /// stage runs.
    pub async fn execute(&self, symbol: &str) -> Result<PipelineRun> {
        let symbol = normalize_symbol(symbol)?;
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline", %run_id, %symbol);
        self.run(run_id, symbol).instrument(span).await
    }

    async fn run(&self, run_id: Uuid, symbol: String) -> Result<PipelineRun> {
        info!(state = %RunState::Pending, parallel = self.parallel, "run created");
        let ctx = StageContext::new(symbol.clone());

        let (news, technical, fundamental) = if self.parallel {
            tokio::try_join!(
                self.run_stage(self.news.as_ref(), &ctx),
                self.run_stage(self.technical.as_ref(), &ctx),
                self.run_stage(self.fundamental.as_ref(), &ctx),
            )?
        } else {
            let news = self.run_stage(self.news.as_ref(), &ctx).await?;
            let technical = self.run_stage(self.technical.as_ref(), &ctx).await?;
            let fundamental = self.run_stage(self.fundamental.as_ref(), &ctx).await?;
            (news, technical, fundamental)
        };
        let news = news.into_news()?;
        let technical = technical.into_technical()?;
        let fundamental = fundamental.into_fundamental()?;

        let ctx = StageContext::with_upstream(
            symbol,
            news.clone(),
            technical.clone(),
            fundamental.clone(),
        );
        let recommendation = self
            .run_stage(self.synthesis.as_ref(), &ctx)
            .await?
            .into_recommendation()?;
        let record = DecisionRecord::from(recommendation);
        info!(
            state = %RunState::Synthesized,
            recommendation = %record.recommendation,
            score = record.score,
            "recommendation ready"
        );

        let persisted = match self.store.insert(&record).await {
            Ok(()) => {
                info!(state = %RunState::Persisted, "decision record stored");
                true
            }
            Err(e) => {
                error!(error = %e, "failed to persist decision record");
                false
            }
        };

        Ok(PipelineRun {
            run_id,
            record,
            news,
            technical,
            fundamental,
            state: if persisted {
                RunState::Persisted
            } else {
                RunState::Synthesized
            },
            persisted,
        })
    }

    async fn run_stage(&self, stage: &dyn AnalysisStage, ctx: &StageContext) -> Result<StageOutput> {
        let kind = stage.kind();
        info!(state = %RunState::Running(kind), "stage started");
        match stage.run(ctx).await {
            Ok(output) => {
                info!(stage = %kind, "stage completed");
                Ok(output)
            }
            Err(e) => {
                error!(state = %RunState::Failed(kind), error = %e, "stage failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{MacdSummary, Recommendation, Trend, Verdict};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Stage returning a fixed output and recording the order of calls
    struct FixedStage {
        output: StageOutput,
        log: Arc<Mutex<Vec<StageKind>>>,
    }

    #[async_trait]
    impl AnalysisStage for FixedStage {
        fn kind(&self) -> StageKind {
            self.output.kind()
        }

        async fn run(&self, _ctx: &StageContext) -> Result<StageOutput> {
            self.log.lock().unwrap().push(self.kind());
            Ok(self.output.clone())
        }
    }

    fn outputs() -> [StageOutput; 4] {
        [
            StageOutput::News(NewsReport {
                symbol: "MSFT".into(),
                sentiment_score: 0.1,
                top_headlines: vec![],
            }),
            StageOutput::Technical(TechnicalReport {
                symbol: "MSFT".into(),
                rsi: 48.0,
                macd: MacdSummary {
                    hist: -0.2,
                    signal: 0.3,
                },
                support_levels: vec![],
                resistance_levels: vec![],
                trend: Trend::Sideways,
            }),
            StageOutput::Fundamental(FundamentalReport {
                symbol: "MSFT".into(),
                revenue_yoy: 12.0,
                eps_yoy: 9.0,
                roe: 0.35,
                debt_to_equity: 0.8,
                cash_flow: 8.7e10,
            }),
            StageOutput::Recommendation(Recommendation {
                symbol: "MSFT".into(),
                recommendation: Verdict::Hold,
                report: "Fairly valued.".into(),
                score: 55.0,
            }),
        ]
    }

    fn pipeline(store: Arc<MemoryStore>) -> (ResearchPipeline, Arc<Mutex<Vec<StageKind>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let [news, technical, fundamental, synthesis] = outputs().map(|output| {
            Arc::new(FixedStage {
                output,
                log: log.clone(),
            }) as Arc<dyn AnalysisStage>
        });
        (
            ResearchPipeline::new(news, technical, fundamental, synthesis, store),
            log,
        )
    }

    #[test]
    fn test_run_state_display() {
        assert_eq!(RunState::Pending.to_string(), "PENDING");
        assert_eq!(
            RunState::Running(StageKind::Technical).to_string(),
            "RUNNING(technical)"
        );
        assert_eq!(
            RunState::Failed(StageKind::Recommendation).to_string(),
            "FAILED(recommendation)"
        );
        let json = serde_json::to_value(RunState::Persisted).unwrap();
        assert_eq!(json["state"], "persisted");
    }

    #[tokio::test]
    async fn test_sequential_order() {
        let store = Arc::new(MemoryStore::new());
        let (pipeline, log) = pipeline(store.clone());
        let pipeline = pipeline.with_parallel(false);

        let run = pipeline.execute(" msft ").await.unwrap();
        assert_eq!(run.record.symbol, "MSFT");
        assert_eq!(run.state, RunState::Persisted);
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                StageKind::News,
                StageKind::Technical,
                StageKind::Fundamental,
                StageKind::Recommendation
            ]
        );
        assert_eq!(store.records().len(), 1);
    }

    #[tokio::test]
    async fn test_synthesis_runs_last_in_parallel_mode() {
        let (pipeline, log) = pipeline(Arc::new(MemoryStore::new()));
        pipeline.execute("MSFT").await.unwrap();

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 4);
        assert_eq!(log[3], StageKind::Recommendation);
    }

    #[tokio::test]
    async fn test_blank_symbol_runs_nothing() {
        let store = Arc::new(MemoryStore::new());
        let (pipeline, log) = pipeline(store.clone());

        let err = pipeline.execute("   ").await.unwrap_err();
        assert!(matches!(err, ResearchError::MalformedInput(_)));
        assert!(log.lock().unwrap().is_empty());
        assert!(store.records().is_empty());
    }

    #[tokio::test]
    async fn test_misrouted_stage_is_rejected() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let [news, technical, fundamental, synthesis] = outputs().map(|output| {
            Arc::new(FixedStage {
                output,
                log: log.clone(),
            }) as Arc<dyn AnalysisStage>
        });
        let store = Arc::new(MemoryStore::new());
        let pipeline =
            ResearchPipeline::new(technical, news, fundamental, synthesis, store.clone());

        let err = pipeline.execute("MSFT").await.unwrap_err();
        assert!(matches!(err, ResearchError::SchemaValidation { .. }));
        assert!(store.records().is_empty());
    }
}
