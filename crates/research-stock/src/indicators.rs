//! Technical indicators over closing prices
//!
//! Every function drops its warm-up rows: the output holds one value per
//! input row from the first fully-defined row onwards. Inputs shorter than
//! the minimum window give an empty vector, never an error. Invalid
//! parameters (zero windows, non-positive multipliers) are errors.

use crate::error::{ResearchError, Result};
use serde::{Deserialize, Serialize};
use ta::Next;
use ta::indicators::{BollingerBands, MovingAverageConvergenceDivergence};

pub const RSI_LENGTH: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const BOLLINGER_PERIOD: usize = 20;
pub const BOLLINGER_MULTIPLIER: f64 = 2.0;

/// One MACD row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdPoint {
    pub macd: f64,
    pub signal: f64,
    pub hist: f64,
}

/// One Bollinger row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerPoint {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

fn indicator_err(e: impl std::fmt::Display) -> ResearchError {
    ResearchError::Indicator(e.to_string())
}

/// Relative strength index with Wilder smoothing
///
/// The first value uses the simple average of the first `length` changes,
/// so the result starts at input row `length`. A window without losses
/// reads 100.
pub fn rsi(closes: &[f64], length: usize) -> Result<Vec<f64>> {
    if length == 0 {
        return Err(indicator_err("RSI length must be at least 1"));
    }
    if closes.len() <= length {
        return Ok(Vec::new());
    }

    let n = length as f64;
    let (mut avg_gain, mut avg_loss) = closes[..=length]
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold((0.0, 0.0), |(g, l), delta| {
            if delta >= 0.0 {
                (g + delta, l)
            } else {
                (g, l - delta)
            }
        });
    avg_gain /= n;
    avg_loss /= n;

    let mut values = Vec::with_capacity(closes.len() - length);
    values.push(rsi_value(avg_gain, avg_loss));

    for w in closes[length..].windows(2) {
        let delta = w[1] - w[0];
        avg_gain = (avg_gain * (n - 1.0) + delta.max(0.0)) / n;
        avg_loss = (avg_loss * (n - 1.0) + (-delta).max(0.0)) / n;
        values.push(rsi_value(avg_gain, avg_loss));
    }

    Ok(values)
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
}

/// Moving average convergence/divergence
///
/// EMAs are seeded with the first close. Rows before the signal line has
/// seen `signal` MACD values after the slow warm-up are dropped.
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Result<Vec<MacdPoint>> {
    if fast == 0 || slow == 0 || signal == 0 {
        return Err(indicator_err("MACD periods must be at least 1"));
    }
    if fast >= slow {
        return Err(indicator_err(format!(
            "MACD fast period ({fast}) must be shorter than slow period ({slow})"
        )));
    }

    let warm_up = slow + signal - 2;
    if closes.len() <= warm_up {
        return Ok(Vec::new());
    }

    let mut indicator =
        MovingAverageConvergenceDivergence::new(fast, slow, signal).map_err(indicator_err)?;

    Ok(closes
        .iter()
        .map(|&close| indicator.next(close))
        .skip(warm_up)
        .map(|out| MacdPoint {
            macd: out.macd,
            signal: out.signal,
            hist: out.histogram,
        })
        .collect())
}

/// Bollinger bands: `period`-bar mean plus/minus `multiplier` population
/// standard deviations
pub fn bollinger_bands(closes: &[f64], period: usize, multiplier: f64) -> Result<Vec<BollingerPoint>> {
    if period == 0 {
        return Err(indicator_err("Bollinger period must be at least 1"));
    }
    if !(multiplier.is_finite() && multiplier > 0.0) {
        return Err(indicator_err(format!(
            "Bollinger multiplier must be positive, got {multiplier}"
        )));
    }
    if closes.len() < period {
        return Ok(Vec::new());
    }

    let mut bands = BollingerBands::new(period, multiplier).map_err(indicator_err)?;

    Ok(closes
        .iter()
        .map(|&close| bands.next(close))
        .skip(period - 1)
        .map(|out| BollingerPoint {
            upper: out.upper,
            middle: out.average,
            lower: out.lower,
        })
        .collect())
}
