//! MACD (Moving Average Convergence Divergence) indicator
//!
//! DIF = EMA(close, 12) - EMA(close, 26)
//! DEA = EMA(DIF, 9)
//! Crossover pair is (DIF, DEA).

use crate::error::EngineError;
use crate::indicators::{PairPoint, PairSeries};
use crate::models::Bar;

pub const FAST_PERIOD: usize = 12;
pub const SLOW_PERIOD: usize = 26;
pub const SIGNAL_PERIOD: usize = 9;

/// Bars needed before the slow EMA has converged past its seed transient.
pub const MIN_BARS: usize = 34;

/// First-value-seeded EMA recurrence: EMA_0 = values[0],
/// EMA_t = EMA_{t-1} * (1 - a) + values[t] * a with a = 2 / (period + 1).
pub(crate) fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut ema = values[0];
    out.push(ema);
    for &value in &values[1..] {
        ema = ema * (1.0 - alpha) + value * alpha;
        out.push(ema);
    }
    out
}

pub fn compute(bars: &[Bar]) -> Result<PairSeries, EngineError> {
    if bars.len() < MIN_BARS {
        return Err(EngineError::InsufficientData {
            have: bars.len(),
            need: MIN_BARS,
        });
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let fast = ema_series(&closes, FAST_PERIOD);
    let slow = ema_series(&closes, SLOW_PERIOD);
    let dif: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    let dea = ema_series(&dif, SIGNAL_PERIOD);

    let points = dif
        .iter()
        .zip(&dea)
        .map(|(&fast, &slow)| PairPoint { fast, slow })
        .collect();

    Ok(PairSeries { offset: 0, points })
}

/// Histogram value for a (DIF, DEA) point: (DIF - DEA) * 2.
pub fn histogram(point: &PairPoint) -> f64 {
    (point.fast - point.slow) * 2.0
}
