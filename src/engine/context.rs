//! Shared collaborator context for the engine

use crate::config::Config;
use crate::market::BarSeriesCache;
use crate::metrics::Metrics;
use crate::notify::NotificationDispatcher;
use crate::store::TaskStore;
use std::sync::Arc;

/// Everything the scheduler and task service need, wired once at startup.
pub struct EngineContext {
    pub config: Config,
    pub cache: Arc<BarSeriesCache>,
    pub store: Arc<TaskStore>,
    pub dispatcher: NotificationDispatcher,
    pub metrics: Option<Arc<Metrics>>,
}

impl EngineContext {
    pub fn new(
        config: Config,
        cache: Arc<BarSeriesCache>,
        store: Arc<TaskStore>,
        dispatcher: NotificationDispatcher,
        metrics: Option<Arc<Metrics>>,
    ) -> Self {
        Self {
            config,
            cache,
            store,
            dispatcher,
            metrics,
        }
    }
}
