//! Stage output schemas
//!
//! Each stage's answer is parsed into a typed report. Parsing is strict:
//! unknown fields, missing fields, wrong types and out-of-range values are
//! all [`ResearchError::SchemaValidation`]. The only leniency is removing a
//! single Markdown code fence around the document.

use crate::error::{ResearchError, Result};
use research_llm::tools::schema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::str::FromStr;

const CASH_FLOW_DESCRIPTION: &str = "Operating cash flow when reported, otherwise net income \
    plus depreciation and amortization";

/// The four pipeline stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    News,
    Technical,
    Fundamental,
    Recommendation,
}

impl StageKind {
    pub const ALL: [Self; 4] = [
        Self::News,
        Self::Technical,
        Self::Fundamental,
        Self::Recommendation,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::News => "news",
            Self::Technical => "technical",
            Self::Fundamental => "fundamental",
            Self::Recommendation => "recommendation",
        }
    }

    /// Name sent with structured-output requests
    pub fn schema_name(self) -> &'static str {
        match self {
            Self::News => "NewsSchema",
            Self::Technical => "TechnicalSchema",
            Self::Fundamental => "FundamentalSchema",
            Self::Recommendation => "RecommendationSchema",
        }
    }

    /// Strict JSON Schema of the stage's output
    pub fn json_schema(self) -> Value {
        let symbol = schema::string("Ticker symbol under analysis");
        match self {
            Self::News => schema::strict_object(
                json!({
                    "symbol": symbol,
                    "sentiment_score": schema::bounded_number(
                        "Aggregate news sentiment, -1 (bearish) to 1 (bullish)", -1.0, 1.0),
                    "top_headlines": schema::array(
                        "Most relevant recent headlines",
                        schema::strict_object(
                            json!({
                                "title": schema::string("Headline"),
                                "link": schema::string("Article URL"),
                                "sentiment": schema::enumeration(
                                    "Headline sentiment", &["pos", "neg", "neu"]),
                            }),
                            &["title", "link", "sentiment"],
                        ),
                    ),
                }),
                &["symbol", "sentiment_score", "top_headlines"],
            ),
            Self::Technical => schema::strict_object(
                json!({
                    "symbol": symbol,
                    "rsi": schema::bounded_number("Latest 14-period RSI", 0.0, 100.0),
                    "macd": schema::strict_object(
                        json!({
                            "hist": schema::number("MACD histogram"),
                            "signal": schema::number("MACD signal line"),
                        }),
                        &["hist", "signal"],
                    ),
                    "support_levels": schema::array("Support prices", schema::number("Price")),
                    "resistance_levels": schema::array("Resistance prices", schema::number("Price")),
                    "trend": schema::enumeration("Recent trend", &["up", "down", "sideways"]),
                }),
                &["symbol", "rsi", "macd", "support_levels", "resistance_levels", "trend"],
            ),
            Self::Fundamental => schema::strict_object(
                json!({
                    "symbol": symbol,
                    "revenue_yoy": schema::number("Revenue growth year over year, percent"),
                    "eps_yoy": schema::number("EPS growth year over year, percent"),
                    "roe": schema::number("Return on equity"),
                    "debt_to_equity": schema::number("Total liabilities over shareholder equity"),
                    "cash_flow": schema::number(CASH_FLOW_DESCRIPTION),
                }),
                &["symbol", "revenue_yoy", "eps_yoy", "roe", "debt_to_equity", "cash_flow"],
            ),
            Self::Recommendation => schema::strict_object(
                json!({
                    "symbol": symbol,
                    "recommendation": schema::enumeration("Verdict", &["BUY", "SELL", "HOLD"]),
                    "report": schema::string("Narrative investment report"),
                    "score": schema::bounded_number("Conviction score", 0.0, 100.0),
                }),
                &["symbol", "recommendation", "report", "score"],
            ),
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Pos,
    Neg,
    Neu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Sideways,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Sideways => "sideways",
        })
    }
}

/// Final call of the synthesis stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Buy,
    Sell,
    Hold,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
            Self::Hold => "HOLD",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verdict {
    type Err = ResearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "BUY" => Ok(Self::Buy),
            "SELL" => Ok(Self::Sell),
            "HOLD" => Ok(Self::Hold),
            other => Err(ResearchError::MalformedInput(format!(
                "unknown recommendation '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Headline {
    pub title: String,
    pub link: String,
    pub sentiment: Sentiment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewsReport {
    pub symbol: String,
    pub sentiment_score: f64,
    pub top_headlines: Vec<Headline>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MacdSummary {
    pub hist: f64,
    pub signal: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TechnicalReport {
    pub symbol: String,
    pub rsi: f64,
    pub macd: MacdSummary,
    pub support_levels: Vec<f64>,
    pub resistance_levels: Vec<f64>,
    pub trend: Trend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FundamentalReport {
    pub symbol: String,
    pub revenue_yoy: f64,
    pub eps_yoy: f64,
    pub roe: f64,
    pub debt_to_equity: f64,
    /// Operating cash flow, or net income plus D&A when it is not reported
    pub cash_flow: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Recommendation {
    pub symbol: String,
    pub recommendation: Verdict,
    pub report: String,
    pub score: f64,
}

/// A typed stage output with its value-domain checks
pub trait StageSchema: DeserializeOwned + Serialize {
    const KIND: StageKind;

    /// Check value domains beyond what deserialization enforces
    fn validate(&self, symbol: &str) -> std::result::Result<(), String>;
}

fn check_symbol(found: &str, expected: &str) -> std::result::Result<(), String> {
    if found.trim().eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(format!("symbol '{found}' does not match '{expected}'"))
    }
}

fn check_finite(field: &str, value: f64) -> std::result::Result<(), String> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(format!("{field} must be a finite number"))
    }
}

fn check_range(field: &str, value: f64, min: f64, max: f64) -> std::result::Result<(), String> {
    check_finite(field, value)?;
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(format!("{field} = {value} is outside [{min}, {max}]"))
    }
}

impl StageSchema for NewsReport {
    const KIND: StageKind = StageKind::News;

    fn validate(&self, symbol: &str) -> std::result::Result<(), String> {
        check_symbol(&self.symbol, symbol)?;
        check_range("sentiment_score", self.sentiment_score, -1.0, 1.0)
    }
}

impl StageSchema for TechnicalReport {
    const KIND: StageKind = StageKind::Technical;

    fn validate(&self, symbol: &str) -> std::result::Result<(), String> {
        check_symbol(&self.symbol, symbol)?;
        check_range("rsi", self.rsi, 0.0, 100.0)?;
        check_finite("macd.hist", self.macd.hist)?;
        check_finite("macd.signal", self.macd.signal)?;
        for level in self.support_levels.iter().chain(&self.resistance_levels) {
            check_finite("price level", *level)?;
        }
        Ok(())
    }
}

impl StageSchema for FundamentalReport {
    const KIND: StageKind = StageKind::Fundamental;

    fn validate(&self, symbol: &str) -> std::result::Result<(), String> {
        check_symbol(&self.symbol, symbol)?;
        check_finite("revenue_yoy", self.revenue_yoy)?;
        check_finite("eps_yoy", self.eps_yoy)?;
        check_finite("roe", self.roe)?;
        check_finite("debt_to_equity", self.debt_to_equity)?;
        check_finite("cash_flow", self.cash_flow)
    }
}

impl StageSchema for Recommendation {
    const KIND: StageKind = StageKind::Recommendation;

    fn validate(&self, symbol: &str) -> std::result::Result<(), String> {
        check_symbol(&self.symbol, symbol)?;
        check_range("score", self.score, 0.0, 100.0)?;
        if self.report.trim().is_empty() {
            return Err("report must not be empty".to_string());
        }
        Ok(())
    }
}

/// Remove one surrounding Markdown code fence, if present
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string (```json)
    match body.split_once('\n') {
        Some((info, content))
            if !info.trim().contains(char::is_whitespace)
                && !info.trim_start().starts_with(['{', '[']) =>
        {
            content.trim()
        }
        _ => body.trim(),
    }
}

/// Parse and validate a stage's raw answer
pub fn parse_output<T: StageSchema>(raw: &str, symbol: &str) -> Result<T> {
    let invalid = |reason: String| ResearchError::SchemaValidation {
        stage: T::KIND,
        reason,
    };

    let document = strip_code_fence(raw);
    let parsed: T = serde_json::from_str(document).map_err(|e| invalid(e.to_string()))?;
    parsed.validate(symbol).map_err(invalid)?;
    Ok(parsed)
}

/// Validated output of any stage
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StageOutput {
    News(NewsReport),
    Technical(TechnicalReport),
    Fundamental(FundamentalReport),
    Recommendation(Recommendation),
}

macro_rules! stage_output_accessor {
    ($fn_name:ident, $variant:ident, $ty:ty) => {
        pub fn $fn_name(self) -> Result<$ty> {
            match self {
                Self::$variant(report) => Ok(report),
                other => Err(ResearchError::SchemaValidation {
                    stage: StageKind::$variant,
                    reason: format!("expected {} output, got {}", StageKind::$variant, other.kind()),
                }),
            }
        }
    };
}

impl StageOutput {
    pub fn kind(&self) -> StageKind {
        match self {
            Self::News(_) => StageKind::News,
            Self::Technical(_) => StageKind::Technical,
            Self::Fundamental(_) => StageKind::Fundamental,
            Self::Recommendation(_) => StageKind::Recommendation,
        }
    }

    /// Parse raw text as the output of `kind`
    pub fn parse(kind: StageKind, raw: &str, symbol: &str) -> Result<Self> {
        Ok(match kind {
            StageKind::News => Self::News(parse_output(raw, symbol)?),
            StageKind::Technical => Self::Technical(parse_output(raw, symbol)?),
            StageKind::Fundamental => Self::Fundamental(parse_output(raw, symbol)?),
            StageKind::Recommendation => Self::Recommendation(parse_output(raw, symbol)?),
        })
    }

    stage_output_accessor!(into_news, News, NewsReport);
    stage_output_accessor!(into_technical, Technical, TechnicalReport);
    stage_output_accessor!(into_fundamental, Fundamental, FundamentalReport);
    stage_output_accessor!(into_recommendation, Recommendation, Recommendation);
}
