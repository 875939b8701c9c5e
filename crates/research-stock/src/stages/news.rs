//! News and sentiment stage

use super::{AnalysisStage, Brief, Delegate, StageContext};
use crate::error::Result;
use crate::fetcher::{FetchRequest, ResilientFetcher};
use crate::schema::{StageKind, StageOutput};
use crate::tools;
use async_trait::async_trait;
use research_core::Persona;
use research_tools::ToolRegistry;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

fn brief() -> Brief {
    Brief {
        kind: StageKind::News,
        persona: Persona::new(
            "Researcher",
            "Gather and interpret news to give a clear picture of the sentiment around a stock.",
            "You read every source carefully and pull out what matters for an investment \
             decision. You never invent headlines or links.",
        ),
        description: "Analyse the latest news about the stock. The reference data holds the \
            articles already collected; use stock_news for more and scrape_website to read an \
            article in full when its summary is not enough. Rate each relevant headline as \
            pos, neg or neu and give an overall sentiment score from -1 (very bearish) to \
            1 (very bullish).",
        expected_output: "The ticker symbol, the overall sentiment_score and up to five \
            top_headlines, each with its title, link and sentiment, taken from real articles.",
    }
}

/// Sentiment of recent news
pub struct NewsStage {
    delegate: Delegate,
    fetcher: Arc<ResilientFetcher>,
    tools: Arc<ToolRegistry>,
}

impl NewsStage {
    pub fn new(
        delegate: Delegate,
        fetcher: Arc<ResilientFetcher>,
        scrape_timeout: Duration,
    ) -> Result<Self> {
        let tools = Arc::new(ToolRegistry::with_tools(tools::news_tools(
            fetcher.clone(),
            scrape_timeout,
        )?));
        Ok(Self {
            delegate,
            fetcher,
            tools,
        })
    }
}

#[async_trait]
impl AnalysisStage for NewsStage {
    fn kind(&self) -> StageKind {
        StageKind::News
    }

    #[instrument(name = "news_stage", skip_all, fields(symbol = %ctx.symbol))]
    async fn run(&self, ctx: &StageContext) -> Result<StageOutput> {
        let news = self.fetcher.fetch(&ctx.symbol, FetchRequest::News).await?;

        self.delegate
            .run(brief(), &ctx.symbol, json!({"news": news}), self.tools.clone())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReportLanguage;
    use crate::error::ResearchError;
    use crate::fetcher::RetryPolicy;
    use crate::market::MockMarketData;
    use crate::stages::test_support::CannedEngine;
    use crate::tools::test_support::fetcher;

    const ANSWER: &str = r#"{"symbol":"AAPL","sentiment_score":0.35,
        "top_headlines":[{"title":"Record quarter","link":"https://example.com/a","sentiment":"pos"}]}"#;

    #[tokio::test]
    async fn test_news_stage_prefetches_and_parses() {
        let engine = Arc::new(CannedEngine::new(ANSWER));
        let stage = NewsStage::new(
            Delegate::new(engine.clone(), ReportLanguage::Korean),
            fetcher(vec![]),
            Duration::from_secs(5),
        )
        .unwrap();

        let output = stage.run(&StageContext::new("AAPL")).await.unwrap();
        let report = output.into_news().unwrap();
        assert!((report.sentiment_score - 0.35).abs() < 1e-9);

        let tasks = engine.tasks.lock().unwrap();
        let task = &tasks[0];
        assert_eq!(task.persona.role, "Researcher");
        assert_eq!(task.context["news"]["articles"][0]["title"], "Record quarter");
        assert!(task.description.contains("Korean"));
        assert_eq!(task.output_schema.as_ref().unwrap().name, "NewsSchema");
        assert_eq!(
            engine.tool_names.lock().unwrap()[0],
            vec!["scrape_website", "stock_news"]
        );
    }

    #[tokio::test]
    async fn test_news_fetch_failure_skips_engine() {
        let mut market = MockMarketData::new();
        market.expect_news().times(1).returning(|symbol| {
            Err(ResearchError::Fetch {
                symbol: symbol.to_string(),
                request: "news".into(),
                reason: "invalid ticker".into(),
            })
        });
        let fetcher = Arc::new(ResilientFetcher::new(Arc::new(market), RetryPolicy::no_retry()));

        let engine = Arc::new(CannedEngine::new(ANSWER));
        let stage = NewsStage::new(
            Delegate::new(engine.clone(), ReportLanguage::English),
            fetcher,
            Duration::from_secs(5),
        )
        .unwrap();

        let err = stage.run(&StageContext::new("AAPL")).await.unwrap_err();
        assert!(matches!(err, ResearchError::Fetch { .. }));
        assert!(engine.tasks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_answer_is_schema_failure() {
        let engine = Arc::new(CannedEngine::new(r#"{"symbol":"AAPL","sentiment_score":0.1}"#));
        let stage = NewsStage::new(
            Delegate::new(engine, ReportLanguage::English),
            fetcher(vec![]),
            Duration::from_secs(5),
        )
        .unwrap();

        let err = stage.run(&StageContext::new("AAPL")).await.unwrap_err();
        assert!(matches!(
            err,
            ResearchError::SchemaValidation {
                stage: StageKind::News,
                ..
            }
        ));
    }
}
