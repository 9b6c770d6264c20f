//! Error taxonomy for the monitoring engine

use thiserror::Error;

/// Failures reported by a market data source.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no data for symbol {symbol}")]
    NotFound { symbol: String },
    #[error("rate limited by data source")]
    RateLimited,
    #[error("data source timed out")]
    Timeout,
    #[error("data source transport failure: {0}")]
    Transport(String),
}

/// Engine-level errors. Command-layer variants (TaskNotFound, PermissionDenied,
/// TaskExists, InvalidTimeframe, InvalidIndicator) surface to the caller and
/// never stop the scheduler; the rest drive the per-task failure handling.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("not enough bars: have {have}, need {need}")]
    InsufficientData { have: usize, need: usize },
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error("notification delivery failed: {0}")]
    Dispatch(String),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("unknown task: {0}")]
    TaskNotFound(String),
    #[error("task {0} belongs to another user")]
    PermissionDenied(String),
    #[error("task already exists: {0}")]
    TaskExists(String),
    #[error("unsupported timeframe: {0}")]
    InvalidTimeframe(String),
    #[error("unsupported indicator: {0}")]
    InvalidIndicator(String),
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Persistence(err.to_string())
    }
}
