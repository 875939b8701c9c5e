//! Deterministic context derived from fetched data
//!
//! These values are computed before a stage is delegated so the reasoning
//! engine works from the same numbers the tools report.

use crate::error::Result;
use crate::indicators::{
    self, BOLLINGER_MULTIPLIER, BOLLINGER_PERIOD, BollingerPoint, MACD_FAST, MACD_SIGNAL,
    MACD_SLOW, MacdPoint, RSI_LENGTH,
};
use crate::market::PriceSeries;
use crate::schema::Trend;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const LEVEL_WINDOW: usize = 60;
const MIN_LEVEL_CLOSES: usize = 10;
const TREND_WINDOW: usize = 30;
const MIN_TREND_CLOSES: usize = 5;
const TREND_THRESHOLD_PCT: f64 = 5.0;

/// Support and resistance price levels
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceLevels {
    pub support: Vec<f64>,
    pub resistance: Vec<f64>,
}

/// Percentile levels over the last 60 closes
///
/// Support is the 10th and 25th percentile, resistance the 75th and 90th;
/// equal picks collapse into one level.
pub fn support_resistance(closes: &[f64]) -> PriceLevels {
    if closes.len() < MIN_LEVEL_CLOSES {
        return PriceLevels::default();
    }

    let mut recent: Vec<f64> = closes[closes.len().saturating_sub(LEVEL_WINDOW)..]
        .iter()
        .copied()
        .filter(|c| c.is_finite())
        .collect();
    if recent.is_empty() {
        return PriceLevels::default();
    }
    recent.sort_by(f64::total_cmp);

    let last = recent.len() - 1;
    let pick = |p: f64| recent[((last as f64 * p).round() as usize).min(last)];
    let levels = |a: f64, b: f64| {
        let (a, b) = (pick(a), pick(b));
        if a == b { vec![a] } else { vec![a, b] }
    };

    PriceLevels {
        support: levels(0.10, 0.25),
        resistance: levels(0.75, 0.90),
    }
}

/// Direction of the last 30 closes
///
/// More than 5% up is `Up`, more than 5% down is `Down`.
pub fn trend(closes: &[f64]) -> Trend {
    if closes.len() < MIN_TREND_CLOSES {
        return Trend::Sideways;
    }

    let window = &closes[closes.len().saturating_sub(TREND_WINDOW)..];
    let (Some(&start), Some(&end)) = (window.first(), window.last()) else {
        return Trend::Sideways;
    };
    if start == 0.0 || !start.is_finite() || !end.is_finite() {
        return Trend::Sideways;
    }

    let change = (end - start) / start.abs() * 100.0;
    if change > TREND_THRESHOLD_PCT {
        Trend::Up
    } else if change < -TREND_THRESHOLD_PCT {
        Trend::Down
    } else {
        Trend::Sideways
    }
}

/// Latest indicator readings for one price series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalSnapshot {
    pub symbol: String,
    pub bars: usize,
    pub as_of: Option<String>,
    pub last_close: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<MacdPoint>,
    pub bollinger: Option<BollingerPoint>,
    pub support_levels: Vec<f64>,
    pub resistance_levels: Vec<f64>,
    pub trend: Trend,
}

impl TechnicalSnapshot {
    pub fn from_series(series: &PriceSeries) -> Result<Self> {
        let closes = series.closes();
        let levels = support_resistance(&closes);

        Ok(Self {
            symbol: series.symbol.clone(),
            bars: series.len(),
            as_of: series.bars.last().map(|b| b.date.clone()),
            last_close: series.last_close(),
            rsi: indicators::rsi(&closes, RSI_LENGTH)?.last().copied(),
            macd: indicators::macd(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL)?
                .last()
                .copied(),
            bollinger: indicators::bollinger_bands(&closes, BOLLINGER_PERIOD, BOLLINGER_MULTIPLIER)?
                .last()
                .copied(),
            support_levels: levels.support,
            resistance_levels: levels.resistance,
            trend: trend(&closes),
        })
    }
}

/// Ratios computed from annual statements
///
/// Growth figures are percentages; ratios are plain fractions. A value is
/// `None` when its inputs are missing or the denominator is zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundamentalMetrics {
    pub fiscal_date: Option<String>,
    pub revenue_yoy: Option<f64>,
    pub eps_yoy: Option<f64>,
    pub roe: Option<f64>,
    pub debt_to_equity: Option<f64>,
    /// Reported operating cash flow, else net income plus depreciation and
    /// amortization
    pub cash_flow: Option<f64>,
}

/// Provider numbers arrive as strings, numbers or `"None"`
fn number(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn annual_reports(statement: &Value) -> &[Value] {
    statement
        .get("annualReports")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn field(report: &Value, key: &str) -> Option<f64> {
    number(report.get(key))
}

fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    let (n, d) = (numerator?, denominator?);
    (d != 0.0).then(|| n / d)
}

/// Growth of the latest available value over the one before, in percent
pub fn year_over_year(values: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    let mut present = values.into_iter().flatten();
    let latest = present.next()?;
    let previous = present.next()?;
    (previous != 0.0).then(|| (latest - previous) / previous.abs() * 100.0)
}

impl FundamentalMetrics {
    /// Compute from Alpha Vantage style `annualReports`, newest first
    pub fn from_statements(income: &Value, balance: &Value) -> Self {
        let income_reports = annual_reports(income);
        let balance_reports = annual_reports(balance);

        let balance_for = |date: Option<&str>| {
            date.and_then(|d| {
                balance_reports
                    .iter()
                    .find(|r| r.get("fiscalDateEnding").and_then(Value::as_str) == Some(d))
            })
        };

        let revenue_yoy = year_over_year(income_reports.iter().map(|r| field(r, "totalRevenue")));

        let eps_yoy = year_over_year(income_reports.iter().map(|r| {
            let date = r.get("fiscalDateEnding").and_then(Value::as_str);
            let shares = balance_for(date).and_then(|b| field(b, "commonStockSharesOutstanding"));
            ratio(field(r, "netIncome"), shares)
        }));

        let latest_income = income_reports.first();
        let latest_balance = balance_reports.first();
        let net_income = latest_income.and_then(|r| field(r, "netIncome"));
        let equity = latest_balance.and_then(|b| field(b, "totalShareholderEquity"));

        let cash_flow = latest_income.and_then(|r| {
            field(r, "operatingCashflow").or_else(|| {
                let depreciation = field(r, "depreciationAndAmortization")?;
                Some(field(r, "netIncome")? + depreciation)
            })
        });

        Self {
            fiscal_date: latest_income
                .and_then(|r| r.get("fiscalDateEnding"))
                .and_then(Value::as_str)
                .map(str::to_string),
            revenue_yoy,
            eps_yoy,
            roe: ratio(net_income, equity),
            debt_to_equity: ratio(
                latest_balance.and_then(|b| field(b, "totalLiabilities")),
                equity,
            ),
            cash_flow,
        }
    }
}
