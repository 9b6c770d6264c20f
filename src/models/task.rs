//! Task, timeframe and signal models

use crate::error::EngineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Bar granularity a task monitors. Also determines the polling cadence of
/// the scheduler loop that owns the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1min")]
    M1,
    #[serde(rename = "5min")]
    M5,
    #[serde(rename = "15min")]
    M15,
    #[serde(rename = "30min")]
    M30,
    #[serde(rename = "60min")]
    M60,
    #[serde(rename = "120min")]
    M120,
    #[serde(rename = "daily")]
    Daily,
}

impl Timeframe {
    pub const ALL: [Timeframe; 7] = [
        Timeframe::M1,
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::M30,
        Timeframe::M60,
        Timeframe::M120,
        Timeframe::Daily,
    ];

    pub fn minutes(&self) -> u32 {
        match self {
            Timeframe::M1 => 1,
            Timeframe::M5 => 5,
            Timeframe::M15 => 15,
            Timeframe::M30 => 30,
            Timeframe::M60 => 60,
            Timeframe::M120 => 120,
            Timeframe::Daily => 1440,
        }
    }

    /// Polling cadence for tasks of this timeframe. Minute frames poll at
    /// the base interval; daily uses its own coarser cadence (day-boundary
    /// semantics are the provider's business, see Config). The newest-bar
    /// timestamp guard in the scheduler makes extra polls no-ops, so the
    /// cadence only controls provider load.
    pub fn poll_interval(&self, base_secs: u64, daily_secs: u64) -> Duration {
        match self {
            Timeframe::Daily => Duration::from_secs(daily_secs),
            _ => Duration::from_secs(base_secs),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1min",
            Timeframe::M5 => "5min",
            Timeframe::M15 => "15min",
            Timeframe::M30 => "30min",
            Timeframe::M60 => "60min",
            Timeframe::M120 => "120min",
            Timeframe::Daily => "daily",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "1min" => Ok(Timeframe::M1),
            "5min" => Ok(Timeframe::M5),
            "15min" => Ok(Timeframe::M15),
            "30min" => Ok(Timeframe::M30),
            "60min" => Ok(Timeframe::M60),
            "120min" => Ok(Timeframe::M120),
            "daily" => Ok(Timeframe::Daily),
            _ => Err(EngineError::InvalidTimeframe(s.to_string())),
        }
    }
}

/// Closed set of indicator kinds. Each kind produces one comparable
/// (fast, slow) pair series for crossover detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndicatorKind {
    #[serde(rename = "MACD")]
    Macd,
    #[serde(rename = "KDJ")]
    Kdj,
    #[serde(rename = "MA")]
    Ma,
}

impl IndicatorKind {
    /// Minimum bar count for a stable value (MACD needs the slow EMA to
    /// converge past its seed transient).
    pub fn min_bars(&self) -> usize {
        match self {
            IndicatorKind::Macd => 34,
            IndicatorKind::Kdj => 10,
            IndicatorKind::Ma => 10,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorKind::Macd => "MACD",
            IndicatorKind::Kdj => "KDJ",
            IndicatorKind::Ma => "MA",
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndicatorKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MACD" => Ok(IndicatorKind::Macd),
            "KDJ" => Ok(IndicatorKind::Kdj),
            "MA" => Ok(IndicatorKind::Ma),
            _ => Err(EngineError::InvalidIndicator(s.to_string())),
        }
    }
}

/// Crossover classification for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SignalKind {
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "golden_cross")]
    GoldenCross,
    #[serde(rename = "death_cross")]
    DeathCross,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::None => "none",
            SignalKind::GoldenCross => "golden_cross",
            SignalKind::DeathCross => "death_cross",
        }
    }
}

/// Most recent (fast, slow) indicator values for a task, kept between
/// evaluations so a crossover can be detected against the previous tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub fast: f64,
    pub slow: f64,
}

/// Immutable task definition. Changing parameters means remove + recreate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorTask {
    pub id: String,
    pub user_id: i64,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub indicator: IndicatorKind,
    pub created_at: DateTime<Utc>,
}

impl MonitorTask {
    pub fn new(user_id: i64, symbol: &str, timeframe: Timeframe, indicator: IndicatorKind) -> Self {
        Self {
            id: format!("{}-{}-{}-{}", user_id, symbol, timeframe, indicator),
            user_id,
            symbol: symbol.to_string(),
            timeframe,
            indicator,
            created_at: Utc::now(),
        }
    }
}

/// Mutable per-task evaluation state, persisted so a restart does not
/// re-fire a signal that was already notified.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskRuntimeState {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_bar_ts: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_snapshot: Option<IndicatorSnapshot>,
    #[serde(default)]
    pub last_signal: SignalKind,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_signal_ts: Option<DateTime<Utc>>,
}

/// Ephemeral crossover event handed to the notification dispatcher.
#[derive(Debug, Clone)]
pub struct SignalEvent {
    pub task_id: String,
    pub user_id: i64,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub indicator: IndicatorKind,
    pub kind: SignalKind,
    pub bar_ts: DateTime<Utc>,
    pub close: f64,
    pub snapshot: IndicatorSnapshot,
}
