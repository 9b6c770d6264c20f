//! Market data access: provider interface and the shared bar cache.

pub mod cache;
pub mod http;

use crate::error::ProviderError;
use crate::models::{Bar, Timeframe};
use async_trait::async_trait;

/// Supplies ordered OHLC bars for a (symbol, timeframe) pair. Bars are
/// returned oldest-to-newest; the newest bar may still be forming.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Bar>, ProviderError>;
}

pub use cache::BarSeriesCache;
pub use http::HttpMarketDataProvider;
