//! Notification delivery: channel interface and the retrying dispatcher.

pub mod format;
pub mod telegram;

use crate::error::EngineError;
use crate::metrics::Metrics;
use crate::models::SignalEvent;
use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Delivers a rendered message to one user. Implementations map transport
/// failures to EngineError::Dispatch.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn send(&self, user_id: i64, text: &str) -> Result<(), EngineError>;
}

/// Hands signal events to the channel with bounded exponential backoff.
///
/// Dispatch is fire-and-forget relative to the evaluation loop: retries run
/// in a spawned task and never block the scheduler. After the retry budget
/// is exhausted the event is dropped, logged, and counted - runtime state
/// has already advanced, so a permanently failing channel cannot cause a
/// re-attempt storm.
#[derive(Clone)]
pub struct NotificationDispatcher {
    channel: Arc<dyn NotificationChannel>,
    metrics: Option<Arc<Metrics>>,
    max_retries: usize,
}

impl NotificationDispatcher {
    pub fn new(
        channel: Arc<dyn NotificationChannel>,
        metrics: Option<Arc<Metrics>>,
        max_retries: usize,
    ) -> Self {
        Self {
            channel,
            metrics,
            max_retries,
        }
    }

    /// Spawn delivery of one event and return immediately.
    pub fn dispatch(&self, event: SignalEvent) {
        let this = self.clone();
        tokio::spawn(async move {
            this.deliver(event).await;
        });
    }

    /// Deliver one event, retrying transient failures. Exposed separately so
    /// callers that need completion (tests, shutdown paths) can await it.
    pub async fn deliver(&self, event: SignalEvent) {
        let text = format::render(&event);
        let send = || async { self.channel.send(event.user_id, &text).await };

        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(500))
            .with_max_delay(Duration::from_secs(30))
            .with_max_times(self.max_retries);

        match send.retry(backoff).await {
            Ok(()) => {
                debug!(
                    task_id = %event.task_id,
                    user_id = event.user_id,
                    kind = event.kind.as_str(),
                    "NotificationDispatcher: delivered {} for task {}",
                    event.kind.as_str(),
                    event.task_id
                );
            }
            Err(e) => {
                if let Some(ref metrics) = self.metrics {
                    metrics.notifications_dropped_total.inc();
                }
                warn!(
                    task_id = %event.task_id,
                    user_id = event.user_id,
                    kind = event.kind.as_str(),
                    error = %e,
                    "NotificationDispatcher: dropping notification for task {} after {} retries",
                    event.task_id,
                    self.max_retries
                );
            }
        }
    }
}
