//! Unit tests for the evaluation scheduler

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use crosswatch::config::Config;
use crosswatch::engine::{EngineContext, MonitorScheduler, TaskService};
use crosswatch::error::{EngineError, ProviderError};
use crosswatch::market::{BarSeriesCache, MarketDataProvider};
use crosswatch::metrics::Metrics;
use crosswatch::models::{Bar, SignalKind, Timeframe};
use crosswatch::notify::{NotificationChannel, NotificationDispatcher};
use crosswatch::store::TaskStore;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

struct ScriptedProvider {
    calls: AtomicUsize,
    windows: Mutex<HashMap<String, Result<Vec<Bar>, ProviderError>>>,
}

impl ScriptedProvider {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            windows: Mutex::new(HashMap::new()),
        }
    }

    fn set(&self, symbol: &str, bars: Vec<Bar>) {
        self.windows
            .lock()
            .unwrap()
            .insert(symbol.to_string(), Ok(bars));
    }

    fn set_failing(&self, symbol: &str) {
        self.windows
            .lock()
            .unwrap()
            .insert(symbol.to_string(), Err(ProviderError::RateLimited));
    }
}

#[async_trait]
impl MarketDataProvider for ScriptedProvider {
    async fn fetch(
        &self,
        symbol: &str,
        _timeframe: Timeframe,
        _count: usize,
    ) -> Result<Vec<Bar>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.windows.lock().unwrap().get(symbol) {
            Some(Ok(bars)) => Ok(bars.clone()),
            Some(Err(ProviderError::RateLimited)) => Err(ProviderError::RateLimited),
            _ => Err(ProviderError::NotFound {
                symbol: symbol.to_string(),
            }),
        }
    }
}

struct SilentChannel;

#[async_trait]
impl NotificationChannel for SilentChannel {
    async fn send(&self, _user_id: i64, _text: &str) -> Result<(), EngineError> {
        Ok(())
    }
}

fn test_config(data_dir: &Path) -> Config {
    Config {
        data_dir: data_dir.to_path_buf(),
        // Zero cadence so every tick refetches through the cache.
        poll_interval_secs: 0,
        daily_poll_interval_secs: 0,
        fetch_count: 250,
        fetch_timeout_secs: 5,
        failure_cooldown_secs: 300,
        notify_max_retries: 0,
        market_data_url: "http://localhost:0".to_string(),
        telegram_token: "test".to_string(),
        telegram_api_url: "http://localhost:0".to_string(),
        gold_futures_contract: "AU2606".to_string(),
        silver_futures_contract: "AG2606".to_string(),
    }
}

fn window(closes: &[f64]) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            Bar::new(
                close,
                close + 1.0,
                close - 1.0,
                close,
                None,
                start + Duration::minutes(60 * i as i64),
            )
        })
        .collect()
}

fn declining_closes() -> Vec<f64> {
    (0..16).map(|i| 100.0 - i as f64).collect()
}

async fn harness(
    dir: &TempDir,
    provider: Arc<ScriptedProvider>,
) -> (MonitorScheduler, Arc<TaskStore>, Arc<Metrics>) {
    let config = test_config(dir.path());
    let metrics = Arc::new(Metrics::new().unwrap());
    let cache = Arc::new(BarSeriesCache::new(
        provider,
        config.fetch_count,
        config.poll_interval_secs,
        config.daily_poll_interval_secs,
        Some(metrics.clone()),
    ));
    let store = Arc::new(
        TaskStore::open(dir.path().join("tasks.json"))
            .await
            .unwrap(),
    );
    let dispatcher = NotificationDispatcher::new(
        Arc::new(SilentChannel),
        Some(metrics.clone()),
        config.notify_max_retries,
    );
    let ctx = Arc::new(EngineContext::new(
        config,
        cache,
        store.clone(),
        dispatcher,
        Some(metrics.clone()),
    ));
    (MonitorScheduler::new(ctx), store, metrics)
}

#[tokio::test]
async fn first_evaluation_seeds_state_without_signal() {
    let dir = TempDir::new().unwrap();
    let provider = Arc::new(ScriptedProvider::new());
    provider.set("Au99.99", window(&declining_closes()));

    let (scheduler, store, metrics) = harness(&dir, provider).await;
    let service = TaskService::new(store.clone());
    service
        .create_task(1, "Au99.99", "60min", "MA")
        .await
        .unwrap();

    scheduler.tick(Timeframe::M60).await;

    let record = &store.load_all().await[0];
    assert!(record.runtime.last_bar_ts.is_some());
    assert!(record.runtime.last_snapshot.is_some());
    assert_eq!(record.runtime.last_signal, SignalKind::None);
    assert_eq!(metrics.signals_emitted_total.with_label_values(&["golden_cross"]).get(), 0);
    assert_eq!(metrics.signals_emitted_total.with_label_values(&["death_cross"]).get(), 0);
}

#[tokio::test]
async fn same_newest_bar_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let provider = Arc::new(ScriptedProvider::new());
    provider.set("Au99.99", window(&declining_closes()));

    let (scheduler, store, _metrics) = harness(&dir, provider).await;
    let service = TaskService::new(store.clone());
    service
        .create_task(1, "Au99.99", "60min", "MA")
        .await
        .unwrap();

    scheduler.tick(Timeframe::M60).await;
    let after_first = store.load_all().await[0].runtime.clone();

    scheduler.tick(Timeframe::M60).await;
    scheduler.tick(Timeframe::M60).await;
    let after_more = store.load_all().await[0].runtime.clone();

    assert_eq!(after_first, after_more);
}

#[tokio::test]
async fn group_shares_one_fetch_per_tick() {
    let dir = TempDir::new().unwrap();
    let provider = Arc::new(ScriptedProvider::new());
    provider.set("Au99.99", window(&declining_closes()));

    let (scheduler, store, _metrics) = harness(&dir, provider.clone()).await;
    let service = TaskService::new(store.clone());
    service
        .create_task(1, "Au99.99", "60min", "MA")
        .await
        .unwrap();
    service
        .create_task(1, "Au99.99", "60min", "KDJ")
        .await
        .unwrap();

    scheduler.tick(Timeframe::M60).await;

    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    for record in store.load_all().await {
        assert!(record.runtime.last_bar_ts.is_some());
    }
}

#[tokio::test]
async fn tick_only_touches_its_own_timeframe() {
    let dir = TempDir::new().unwrap();
    let provider = Arc::new(ScriptedProvider::new());
    provider.set("Au99.99", window(&declining_closes()));

    let (scheduler, store, _metrics) = harness(&dir, provider.clone()).await;
    let service = TaskService::new(store.clone());
    service
        .create_task(1, "Au99.99", "15min", "MA")
        .await
        .unwrap();

    scheduler.tick(Timeframe::M60).await;
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);

    scheduler.tick(Timeframe::M15).await;
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn provider_failure_is_isolated_and_cooled_down() {
    let dir = TempDir::new().unwrap();
    let provider = Arc::new(ScriptedProvider::new());
    provider.set_failing("Au99.99");
    provider.set("000001", window(&declining_closes()));

    let (scheduler, store, metrics) = harness(&dir, provider.clone()).await;
    let service = TaskService::new(store.clone());
    let failing = service
        .create_task(1, "Au99.99", "60min", "MA")
        .await
        .unwrap();
    let healthy = service
        .create_task(1, "000001", "60min", "MA")
        .await
        .unwrap();

    scheduler.tick(Timeframe::M60).await;

    let records = store.load_all().await;
    let failing_rt = &records.iter().find(|r| r.task.id == failing.id).unwrap().runtime;
    let healthy_rt = &records.iter().find(|r| r.task.id == healthy.id).unwrap().runtime;
    assert!(failing_rt.last_bar_ts.is_none(), "failed task must not advance");
    assert!(healthy_rt.last_bar_ts.is_some(), "other group must proceed");
    assert_eq!(metrics.evaluation_failures_total.get(), 1);

    // The failed task is cooling down: the next tick must not refetch it
    // even though the provider has recovered.
    provider.set("Au99.99", window(&declining_closes()));
    let calls_before = provider.calls.load(Ordering::SeqCst);
    scheduler.tick(Timeframe::M60).await;
    let calls_after = provider.calls.load(Ordering::SeqCst);

    // Only the healthy symbol's (cached, zero-TTL) window is refetched.
    assert_eq!(calls_after - calls_before, 1);
    let records = store.load_all().await;
    let failing_rt = &records.iter().find(|r| r.task.id == failing.id).unwrap().runtime;
    assert!(failing_rt.last_bar_ts.is_none());
}

#[tokio::test]
async fn insufficient_history_keeps_task_idle_and_retries() {
    let dir = TempDir::new().unwrap();
    let provider = Arc::new(ScriptedProvider::new());
    provider.set("Au99.99", window(&[100.0; 5]));

    let (scheduler, store, _metrics) = harness(&dir, provider.clone()).await;
    let service = TaskService::new(store.clone());
    service
        .create_task(1, "Au99.99", "60min", "MA")
        .await
        .unwrap();

    scheduler.tick(Timeframe::M60).await;
    assert!(store.load_all().await[0].runtime.last_bar_ts.is_none());

    // More history arrives: no cooldown stands in the way.
    provider.set("Au99.99", window(&declining_closes()));
    scheduler.tick(Timeframe::M60).await;
    assert!(store.load_all().await[0].runtime.last_bar_ts.is_some());
}
