//! Unit tests for the notification dispatcher

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use crosswatch::error::EngineError;
use crosswatch::metrics::Metrics;
use crosswatch::models::{IndicatorKind, IndicatorSnapshot, SignalEvent, SignalKind, Timeframe};
use crosswatch::notify::{NotificationChannel, NotificationDispatcher};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

struct RecordingChannel {
    attempts: AtomicUsize,
    failing: AtomicBool,
    sent: Mutex<Vec<(i64, String)>>,
}

impl RecordingChannel {
    fn new(failing: bool) -> Self {
        Self {
            attempts: AtomicUsize::new(0),
            failing: AtomicBool::new(failing),
            sent: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    async fn send(&self, user_id: i64, text: &str) -> Result<(), EngineError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(EngineError::Dispatch("channel unreachable".to_string()));
        }
        self.sent.lock().await.push((user_id, text.to_string()));
        Ok(())
    }
}

fn event(kind: SignalKind) -> SignalEvent {
    SignalEvent {
        task_id: "9-Au99.99-60min-MACD".to_string(),
        user_id: 9,
        symbol: "Au99.99".to_string(),
        timeframe: Timeframe::M60,
        indicator: IndicatorKind::Macd,
        kind,
        bar_ts: Utc.with_ymd_and_hms(2026, 1, 7, 10, 0, 0).unwrap(),
        close: 812.34,
        snapshot: IndicatorSnapshot {
            fast: 0.1,
            slow: 0.0,
        },
    }
}

#[tokio::test]
async fn delivers_rendered_message() {
    let channel = Arc::new(RecordingChannel::new(false));
    let dispatcher = NotificationDispatcher::new(channel.clone(), None, 3);

    dispatcher.deliver(event(SignalKind::GoldenCross)).await;

    let sent = channel.sent.lock().await;
    assert_eq!(sent.len(), 1);
    let (user_id, text) = &sent[0];
    assert_eq!(*user_id, 9);
    assert!(text.contains("Au99.99"));
    assert!(text.contains("MACD golden cross"));
    assert!(text.contains("60min"));
    assert!(text.contains("812.34"));
}

#[tokio::test]
async fn exhausted_retries_drop_and_count() {
    let channel = Arc::new(RecordingChannel::new(true));
    let metrics = Arc::new(Metrics::new().unwrap());
    let dispatcher = NotificationDispatcher::new(channel.clone(), Some(metrics.clone()), 1);

    dispatcher.deliver(event(SignalKind::DeathCross)).await;

    // Initial attempt plus one retry, then the event is dropped.
    assert_eq!(channel.attempts.load(Ordering::SeqCst), 2);
    assert!(channel.sent.lock().await.is_empty());
    assert_eq!(metrics.notifications_dropped_total.get(), 1);
}

#[tokio::test]
async fn recovery_after_drop_delivers_next_event() {
    let channel = Arc::new(RecordingChannel::new(true));
    let metrics = Arc::new(Metrics::new().unwrap());
    let dispatcher = NotificationDispatcher::new(channel.clone(), Some(metrics.clone()), 0);

    dispatcher.deliver(event(SignalKind::GoldenCross)).await;
    assert_eq!(metrics.notifications_dropped_total.get(), 1);

    channel.failing.store(false, Ordering::SeqCst);
    dispatcher.deliver(event(SignalKind::DeathCross)).await;

    let sent = channel.sent.lock().await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].1.contains("MACD death cross"));
    assert_eq!(metrics.notifications_dropped_total.get(), 1);
}
