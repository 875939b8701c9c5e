//! Configuration for the research pipeline
//!
//! [`ResearchConfig`] is loaded once at process start (see
//! [`ResearchConfig::from_env`]) and then shared read-only as
//! `Arc<ResearchConfig>`.

use crate::error::{ResearchError, Result};
use crate::fetcher::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";
pub const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Language of the narrative report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportLanguage {
    #[default]
    English,
    Korean,
}

impl ReportLanguage {
    /// Instruction appended to prompts that produce prose
    pub fn instruction(self) -> &'static str {
        match self {
            Self::English => "Write every free-text field in English.",
            Self::Korean => "Write every free-text field in Korean (한국어).",
        }
    }
}

impl FromStr for ReportLanguage {
    type Err = ResearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Self::English),
            "ko" | "kr" | "korean" => Ok(Self::Korean),
            other => Err(ResearchError::Config(format!(
                "unknown report language '{other}'"
            ))),
        }
    }
}

/// Settings for one research process
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// OpenAI API key
    #[serde(skip_serializing)]
    pub openai_api_key: String,

    /// Base URL of the chat-completions API
    pub openai_api_base: String,

    /// Model used by every stage
    pub model: String,

    /// Token budget per completion
    pub max_tokens: usize,

    pub temperature: f32,

    /// Bound on agent-loop round trips per stage
    pub max_iterations: usize,

    /// Alpha Vantage API key (news, statements, insider data)
    #[serde(skip_serializing)]
    pub alpha_vantage_api_key: String,

    /// Alpha Vantage requests per minute
    pub alpha_vantage_rate_limit: u32,

    /// Timeout for outbound HTTP calls
    pub request_timeout: Duration,

    /// Total attempts per fetch, first call included
    pub fetch_retries: u32,

    /// Backoff base; attempt `n` waits `retry_base_delay * 2^n` plus jitter
    pub retry_base_delay: Duration,

    /// Upper bound of the uniform jitter added to each backoff
    pub retry_jitter: Duration,

    /// Run the three independent stages concurrently
    pub parallel_stages: bool,

    pub report_language: ReportLanguage,

    /// Postgres URL; absent means records are kept in memory
    #[serde(skip_serializing)]
    pub database_url: Option<String>,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            openai_api_base: DEFAULT_OPENAI_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 4096,
            temperature: 0.2,
            max_iterations: 8,
            alpha_vantage_api_key: String::new(),
            alpha_vantage_rate_limit: 5,
            request_timeout: Duration::from_secs(30),
            fetch_retries: 3,
            retry_base_delay: Duration::from_secs(1),
            retry_jitter: Duration::from_secs(1),
            parallel_stages: true,
            report_language: ReportLanguage::English,
            database_url: None,
        }
    }
}

impl ResearchConfig {
    pub fn builder() -> ResearchConfigBuilder {
        ResearchConfigBuilder::default()
    }

    /// Load `.env` (if present) and then read the process environment
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut builder = Self::builder();

        if let Some(key) = get("OPENAI_API_KEY") {
            builder = builder.openai_api_key(key);
        }
        if let Some(base) = get("OPENAI_API_BASE") {
            builder = builder.openai_api_base(base);
        }
        if let Some(model) = get("OPENAI_MODEL_NAME") {
            builder = builder.model(model);
        }
        if let Some(key) = get("ALPHA_VANTAGE_API_KEY") {
            builder = builder.alpha_vantage_api_key(key);
        }
        if let Some(url) = get("DATABASE_URL") {
            builder = builder.database_url(url);
        }
        if let Some(raw) = get("RESEARCH_FETCH_RETRIES") {
            let retries = raw.trim().parse().map_err(|_| {
                ResearchError::Config(format!("RESEARCH_FETCH_RETRIES must be a number, got '{raw}'"))
            })?;
            builder = builder.fetch_retries(retries);
        }
        if let Some(raw) = get("RESEARCH_PARALLEL_STAGES") {
            builder = builder.parallel_stages(parse_bool("RESEARCH_PARALLEL_STAGES", &raw)?);
        }
        if let Some(raw) = get("RESEARCH_REPORT_LANGUAGE") {
            builder = builder.report_language(raw.parse()?);
        }

        builder.build()
    }

    /// Check the settings that every run depends on
    pub fn validate(&self) -> Result<()> {
        if self.fetch_retries == 0 {
            return Err(ResearchError::Config(
                "fetch_retries must be at least 1".to_string(),
            ));
        }
        if self.retry_base_delay.is_zero() {
            return Err(ResearchError::Config(
                "retry_base_delay must be greater than zero".to_string(),
            ));
        }
        // Keeps base * 2^n + jitter non-decreasing across attempts
        if self.retry_jitter > self.retry_base_delay {
            return Err(ResearchError::Config(format!(
                "retry_jitter ({:?}) must not exceed retry_base_delay ({:?})",
                self.retry_jitter, self.retry_base_delay
            )));
        }
        if self.max_iterations == 0 {
            return Err(ResearchError::Config(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if self.alpha_vantage_rate_limit == 0 {
            return Err(ResearchError::Config(
                "alpha_vantage_rate_limit must be at least 1".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ResearchError::Config(format!(
                "temperature must be within [0, 2], got {}",
                self.temperature
            )));
        }
        if self.model.trim().is_empty() {
            return Err(ResearchError::Config("model must not be empty".to_string()));
        }
        Ok(())
    }

    /// Check that credentials for live providers are present
    pub fn require_credentials(&self) -> Result<()> {
        if self.openai_api_key.trim().is_empty() {
            return Err(ResearchError::Config(
                "OPENAI_API_KEY is not set".to_string(),
            ));
        }
        if self.alpha_vantage_api_key.trim().is_empty() {
            return Err(ResearchError::Config(
                "ALPHA_VANTAGE_API_KEY is not set".to_string(),
            ));
        }
        Ok(())
    }

    /// Retry policy for the resilient fetcher
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.fetch_retries, self.retry_base_delay, self.retry_jitter)
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ResearchError::Config(format!(
            "{key} must be a boolean, got '{raw}'"
        ))),
    }
}

/// Builder for [`ResearchConfig`]
#[derive(Debug, Default)]
pub struct ResearchConfigBuilder {
    config: Option<ResearchConfig>,
}

impl ResearchConfigBuilder {
    fn config(&mut self) -> &mut ResearchConfig {
        self.config.get_or_insert_with(ResearchConfig::default)
    }

    pub fn openai_api_key(mut self, key: impl Into<String>) -> Self {
        self.config().openai_api_key = key.into();
        self
    }

    pub fn openai_api_base(mut self, base: impl Into<String>) -> Self {
        self.config().openai_api_base = base.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config().model = model.into();
        self
    }

    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.config().max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config().temperature = temperature;
        self
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.config().max_iterations = max_iterations;
        self
    }

    pub fn alpha_vantage_api_key(mut self, key: impl Into<String>) -> Self {
        self.config().alpha_vantage_api_key = key.into();
        self
    }

    pub fn alpha_vantage_rate_limit(mut self, per_minute: u32) -> Self {
        self.config().alpha_vantage_rate_limit = per_minute;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config().request_timeout = timeout;
        self
    }

    pub fn fetch_retries(mut self, retries: u32) -> Self {
        self.config().fetch_retries = retries;
        self
    }

    pub fn retry_base_delay(mut self, delay: Duration) -> Self {
        self.config().retry_base_delay = delay;
        self
    }

    pub fn retry_jitter(mut self, jitter: Duration) -> Self {
        self.config().retry_jitter = jitter;
        self
    }

    pub fn parallel_stages(mut self, parallel: bool) -> Self {
        self.config().parallel_stages = parallel;
        self
    }

    pub fn report_language(mut self, language: ReportLanguage) -> Self {
        self.config().report_language = language;
        self
    }

    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.config().database_url = Some(url.into());
        self
    }

    /// Validate and build
    pub fn build(mut self) -> Result<ResearchConfig> {
        let config = self.config().clone();
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = ResearchConfig::default();
        assert_eq!(config.model, "gpt-4.1-mini");
        assert_eq!(config.fetch_retries, 3);
        assert_eq!(config.retry_base_delay, Duration::from_secs(1));
        assert!(config.parallel_stages);
        assert!(config.database_url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = ResearchConfig::builder()
            .model("gpt-4o")
            .fetch_retries(5)
            .parallel_stages(false)
            .report_language(ReportLanguage::Korean)
            .build()
            .unwrap();

        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.fetch_retries, 5);
        assert!(!config.parallel_stages);
        assert_eq!(config.report_language, ReportLanguage::Korean);
    }

    #[test]
    fn test_zero_retries_rejected() {
        let result = ResearchConfig::builder().fetch_retries(0).build();
        assert!(matches!(result, Err(ResearchError::Config(_))));
    }

    #[test]
    fn test_jitter_above_base_delay_rejected() {
        let result = ResearchConfig::builder()
            .retry_base_delay(Duration::from_millis(100))
            .retry_jitter(Duration::from_secs(1))
            .build();
        assert!(matches!(result, Err(ResearchError::Config(_))));

        let result = ResearchConfig::builder()
            .retry_base_delay(Duration::ZERO)
            .retry_jitter(Duration::ZERO)
            .build();
        assert!(matches!(result, Err(ResearchError::Config(_))));

        let config = ResearchConfig::builder()
            .retry_base_delay(Duration::from_millis(500))
            .retry_jitter(Duration::from_millis(500))
            .build()
            .unwrap();
        let policy = config.retry_policy();
        let mut previous = Duration::ZERO;
        for attempt in 0..config.fetch_retries {
            for sample in [0.0, 0.999] {
                let delay = policy.delay_for(attempt, sample);
                assert!(delay >= previous, "backoff decreased: {previous:?} -> {delay:?}");
            }
            previous = policy.delay_for(attempt, 0.999);
        }
    }

    #[test]
    fn test_from_lookup() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_MODEL_NAME", "gpt-4.1"),
            ("ALPHA_VANTAGE_API_KEY", "av-test"),
            ("DATABASE_URL", "postgres://localhost/research"),
            ("RESEARCH_FETCH_RETRIES", "4"),
            ("RESEARCH_PARALLEL_STAGES", "false"),
            ("RESEARCH_REPORT_LANGUAGE", "ko"),
            ("OPENAI_API_BASE", "  "),
        ]);

        let config =
            ResearchConfig::from_lookup(|k| env.get(k).map(ToString::to_string)).unwrap();

        assert_eq!(config.openai_api_key, "sk-test");
        assert_eq!(config.model, "gpt-4.1");
        assert_eq!(config.openai_api_base, DEFAULT_OPENAI_API_BASE);
        assert_eq!(config.fetch_retries, 4);
        assert!(!config.parallel_stages);
        assert_eq!(config.report_language, ReportLanguage::Korean);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/research")
        );
        assert!(config.require_credentials().is_ok());
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let result = ResearchConfig::from_lookup(|k| {
            (k == "RESEARCH_PARALLEL_STAGES").then(|| "maybe".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_credentials() {
        let config = ResearchConfig::default();
        assert!(config.require_credentials().is_err());
    }

    #[test]
    fn test_secrets_not_serialized() {
        let config = ResearchConfig::builder()
            .openai_api_key("sk-secret")
            .build()
            .unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("sk-secret"));
    }

    #[test]
    fn test_retry_policy_from_config() {
        let policy = ResearchConfig::default().retry_policy();
        assert_eq!(policy.retries, 3);
        assert_eq!(policy.base_delay, Duration::from_secs(1));
    }
}
