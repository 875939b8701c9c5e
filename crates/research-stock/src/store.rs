//! Persistence of final decision records
//!
//! The pipeline writes exactly one [`DecisionRecord`] per successful run
//! through a [`RecommendationStore`]. Records are only ever appended.

use crate::error::{ResearchError, Result};
use crate::schema::{Recommendation, Verdict};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::str::FromStr;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Final persisted outcome of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub symbol: String,
    pub recommendation: Verdict,
    /// Confidence in [0, 100]
    pub score: f64,
    pub report: String,
}

impl From<Recommendation> for DecisionRecord {
    fn from(rec: Recommendation) -> Self {
        Self {
            symbol: rec.symbol.trim().to_uppercase(),
            recommendation: rec.recommendation,
            score: rec.score,
            report: rec.report,
        }
    }
}

/// Append-only sink for decision records
#[async_trait]
pub trait RecommendationStore: Send + Sync {
    async fn insert(&self, record: &DecisionRecord) -> Result<()>;
}

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS stock_recommendation (
    id BIGSERIAL PRIMARY KEY,
    symbol TEXT NOT NULL,
    recommendation TEXT NOT NULL,
    score NUMERIC NOT NULL DEFAULT 0,
    report TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
)";

const INSERT_RECORD: &str = "INSERT INTO stock_recommendation (symbol, recommendation, score, report)
    VALUES ($1, $2, $3::float8, $4)";

/// Postgres-backed store writing to `stock_recommendation`
#[derive(Debug, Clone)]
pub struct PgRecommendationStore {
    pool: PgPool,
}

impl PgRecommendationStore {
    /// Build a lazily connecting pool; nothing touches the network until the first insert
    pub fn connect_lazy(database_url: &str) -> Result<Self> {
        let options = PgConnectOptions::from_str(database_url)
            .map_err(|e| ResearchError::Config(format!("invalid DATABASE_URL: {e}")))?;
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect_lazy_with(options);
        Ok(Self { pool })
    }

    /// Create the table if it does not exist yet
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .await
            .map_err(|e| ResearchError::Persistence(e.to_string()))?;
        info!("stock_recommendation table ready");
        Ok(())
    }
}

#[async_trait]
impl RecommendationStore for PgRecommendationStore {
    #[instrument(skip_all, fields(symbol = %record.symbol))]
    async fn insert(&self, record: &DecisionRecord) -> Result<()> {
        let result = sqlx::query(INSERT_RECORD)
            .bind(&record.symbol)
            .bind(record.recommendation.as_str())
            .bind(record.score)
            .bind(&record.report)
            .execute(&self.pool)
            .await
            .map_err(|e| ResearchError::Persistence(e.to_string()))?;
        debug!(rows = result.rows_affected(), "decision record inserted");
        Ok(())
    }
}

/// In-process store for dry runs and tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<DecisionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything inserted so far, oldest first
    pub fn records(&self) -> Vec<DecisionRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RecommendationStore for MemoryStore {
    async fn insert(&self, record: &DecisionRecord) -> Result<()> {
        self.records
            .lock()
            .map_err(|_| ResearchError::Persistence("memory store poisoned".to_string()))?
            .push(record.clone());
        Ok(())
    }
}
