//! KDJ stochastic indicator
//!
//! RSV = (close - lowest_low(9)) / (highest_high(9) - lowest_low(9)) * 100,
//! smoothed into K and D with 1/3 weight recurrences seeded at 50.
//! Crossover pair is (K, D).

use crate::error::EngineError;
use crate::indicators::{PairPoint, PairSeries};
use crate::models::Bar;

pub const RSV_PERIOD: usize = 9;
pub const MIN_BARS: usize = 10;

pub fn compute(bars: &[Bar]) -> Result<PairSeries, EngineError> {
    if bars.len() < MIN_BARS {
        return Err(EngineError::InsufficientData {
            have: bars.len(),
            need: MIN_BARS,
        });
    }

    let mut points = Vec::with_capacity(bars.len());
    let mut k = 50.0;
    let mut d = 50.0;

    for (i, bar) in bars.iter().enumerate() {
        // RSV is defined as 50 until a full window exists, and when the
        // window range is degenerate (high == low).
        let rsv = if i + 1 < RSV_PERIOD {
            50.0
        } else {
            let window = &bars[i + 1 - RSV_PERIOD..=i];
            let low = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
            let high = window
                .iter()
                .map(|b| b.high)
                .fold(f64::NEG_INFINITY, f64::max);
            if high == low {
                50.0
            } else {
                (bar.close - low) / (high - low) * 100.0
            }
        };

        k = k * (2.0 / 3.0) + rsv * (1.0 / 3.0);
        d = d * (2.0 / 3.0) + k * (1.0 / 3.0);
        points.push(PairPoint { fast: k, slow: d });
    }

    Ok(PairSeries { offset: 0, points })
}

/// J line for a (K, D) point: 3K - 2D.
pub fn j_value(point: &PairPoint) -> f64 {
    3.0 * point.fast - 2.0 * point.slow
}
