//! Pure indicator computation over ordered bar sequences.
//!
//! Every kind converges on the same (fast, slow) pair output so the signal
//! detector can consume them uniformly.

pub mod kdj;
pub mod ma;
pub mod macd;

use crate::error::EngineError;
use crate::models::{Bar, IndicatorKind, IndicatorSnapshot};

/// One (fast, slow) indicator value pair for a single bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairPoint {
    pub fast: f64,
    pub slow: f64,
}

impl PairPoint {
    pub fn snapshot(&self) -> IndicatorSnapshot {
        IndicatorSnapshot {
            fast: self.fast,
            slow: self.slow,
        }
    }
}

/// Pair values aligned with the input bars: `points[i]` belongs to
/// `bars[offset + i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PairSeries {
    pub offset: usize,
    pub points: Vec<PairPoint>,
}

impl PairSeries {
    pub fn latest(&self) -> Option<&PairPoint> {
        self.points.last()
    }
}

/// Compute the crossover pair series for an indicator kind. Deterministic,
/// no side effects; fails with InsufficientData below the kind's warmup.
pub fn compute(kind: IndicatorKind, bars: &[Bar]) -> Result<PairSeries, EngineError> {
    match kind {
        IndicatorKind::Macd => macd::compute(bars),
        IndicatorKind::Kdj => kdj::compute(bars),
        IndicatorKind::Ma => ma::compute(bars),
    }
}
