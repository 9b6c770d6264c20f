//! Simple moving average pair (MA5 / MA10)

use crate::error::EngineError;
use crate::indicators::{PairPoint, PairSeries};
use crate::models::Bar;

pub const FAST_PERIOD: usize = 5;
pub const SLOW_PERIOD: usize = 10;
pub const MIN_BARS: usize = 10;

fn sma(bars: &[Bar]) -> f64 {
    bars.iter().map(|b| b.close).sum::<f64>() / bars.len() as f64
}

pub fn compute(bars: &[Bar]) -> Result<PairSeries, EngineError> {
    if bars.len() < MIN_BARS {
        return Err(EngineError::InsufficientData {
            have: bars.len(),
            need: MIN_BARS,
        });
    }

    // Both averages are defined once SLOW_PERIOD bars exist.
    let offset = SLOW_PERIOD - 1;
    let mut points = Vec::with_capacity(bars.len() - offset);
    for i in offset..bars.len() {
        points.push(PairPoint {
            fast: sma(&bars[i + 1 - FAST_PERIOD..=i]),
            slow: sma(&bars[i + 1 - SLOW_PERIOD..=i]),
        });
    }

    Ok(PairSeries { offset, points })
}
