//! Shared bar window cache with single-flight fetching.
//!
//! Tasks sharing a (symbol, timeframe) key read one cached window per polling
//! interval instead of each hitting the provider. Concurrent callers of the
//! same key serialize on the slot lock, so a stale window is refetched by
//! exactly one of them; distinct keys proceed in parallel.

use crate::error::EngineError;
use crate::market::MarketDataProvider;
use crate::metrics::Metrics;
use crate::models::{Bar, Timeframe};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Default)]
struct Slot {
    bars: Arc<Vec<Bar>>,
    fetched_at: Option<Instant>,
}

pub struct BarSeriesCache {
    provider: Arc<dyn MarketDataProvider>,
    metrics: Option<Arc<Metrics>>,
    fetch_count: usize,
    poll_interval_secs: u64,
    daily_poll_interval_secs: u64,
    slots: Mutex<HashMap<(String, Timeframe), Arc<Mutex<Slot>>>>,
}

impl BarSeriesCache {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        fetch_count: usize,
        poll_interval_secs: u64,
        daily_poll_interval_secs: u64,
        metrics: Option<Arc<Metrics>>,
    ) -> Self {
        Self {
            provider,
            metrics,
            fetch_count,
            poll_interval_secs,
            daily_poll_interval_secs,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached window for (symbol, timeframe), refetching when the
    /// window is older than one polling interval for that timeframe. Fails
    /// with InsufficientData when the provider cannot supply `min_count`
    /// bars.
    pub async fn get_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        min_count: usize,
    ) -> Result<Arc<Vec<Bar>>, EngineError> {
        let slot = {
            let mut slots = self.slots.lock().await;
            slots
                .entry((symbol.to_string(), timeframe))
                .or_insert_with(|| Arc::new(Mutex::new(Slot::default())))
                .clone()
        };

        let mut slot = slot.lock().await;
        let ttl = timeframe.poll_interval(self.poll_interval_secs, self.daily_poll_interval_secs);
        let fresh = slot
            .fetched_at
            .map_or(false, |fetched| fetched.elapsed() < ttl);

        if !fresh {
            let bars = self
                .provider
                .fetch(symbol, timeframe, self.fetch_count)
                .await?;
            if let Some(ref metrics) = self.metrics {
                metrics.provider_fetches_total.inc();
            }
            debug!(
                symbol = %symbol,
                timeframe = %timeframe,
                count = bars.len(),
                "BarSeriesCache: refreshed window for {}/{}",
                symbol,
                timeframe
            );
            slot.bars = Arc::new(bars);
            slot.fetched_at = Some(Instant::now());
        }

        if slot.bars.len() < min_count {
            return Err(EngineError::InsufficientData {
                have: slot.bars.len(),
                need: min_count,
            });
        }

        Ok(slot.bars.clone())
    }
}
