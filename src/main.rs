use crosswatch::config::Config;
use crosswatch::engine::{EngineContext, MonitorScheduler};
use crosswatch::logging;
use crosswatch::market::{BarSeriesCache, HttpMarketDataProvider};
use crosswatch::metrics::Metrics;
use crosswatch::notify::{telegram::TelegramChannel, NotificationDispatcher};
use crosswatch::store::TaskStore;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    logging::init_logging();

    let config = Config::from_env()?;
    let metrics = Arc::new(Metrics::new()?);

    let provider = Arc::new(HttpMarketDataProvider::new(&config)?);
    let cache = Arc::new(BarSeriesCache::new(
        provider,
        config.fetch_count,
        config.poll_interval_secs,
        config.daily_poll_interval_secs,
        Some(metrics.clone()),
    ));

    // A corrupt store is a startup failure: running with a partial task set
    // would silently drop monitors.
    let store = Arc::new(TaskStore::open(config.data_dir.join("tasks.json")).await?);

    let channel = Arc::new(TelegramChannel::new(&config)?);
    let dispatcher =
        NotificationDispatcher::new(channel, Some(metrics.clone()), config.notify_max_retries);

    let task_count = store.load_all().await.len();
    let ctx = Arc::new(EngineContext::new(
        config,
        cache,
        store,
        dispatcher,
        Some(metrics),
    ));

    let scheduler = MonitorScheduler::new(ctx);
    let handles = scheduler.start();
    info!(
        task_count,
        "crosswatch: monitoring engine started with {} tasks", task_count
    );

    tokio::signal::ctrl_c().await?;
    info!("crosswatch: shutdown requested, draining in-flight evaluations");
    scheduler.shutdown();
    futures_util::future::join_all(handles).await;
    info!("crosswatch: stopped");

    Ok(())
}
