//! Per-timeframe evaluation scheduler
//!
//! One loop per timeframe ticks at that timeframe's polling cadence, groups
//! eligible tasks by symbol, fetches each group's bar window once through
//! the shared cache, and runs the indicator/detector pipeline per task.
//! Failures are isolated per group/task; shutdown drains the in-flight
//! batch before loops exit.

use crate::engine::context::EngineContext;
use crate::error::EngineError;
use crate::indicators;
use crate::models::{Bar, SignalEvent, SignalKind, TaskRuntimeState, Timeframe};
use crate::signals;
use crate::store::TaskRecord;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Lifecycle of one task inside the scheduler.
#[derive(Debug, Clone, Copy, PartialEq)]
enum TaskPhase {
    Idle,
    Evaluating,
    Failed { until: Instant },
}

pub struct MonitorScheduler {
    ctx: Arc<EngineContext>,
    phases: Arc<Mutex<HashMap<String, TaskPhase>>>,
    shutdown_tx: watch::Sender<bool>,
}

impl MonitorScheduler {
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            ctx,
            phases: Arc::new(Mutex::new(HashMap::new())),
            shutdown_tx,
        }
    }

    /// Spawn one evaluation loop per timeframe. Every loop ticks immediately
    /// on startup (catch-up, daily included), then at its polling cadence.
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        Timeframe::ALL
            .iter()
            .map(|&timeframe| {
                let ctx = self.ctx.clone();
                let phases = self.phases.clone();
                let shutdown = self.shutdown_tx.subscribe();
                tokio::spawn(async move {
                    Self::timeframe_loop(ctx, phases, shutdown, timeframe).await;
                })
            })
            .collect()
    }

    /// Ask the loops to stop. Each one finishes its in-flight batch (runtime
    /// updates included) and exits; await the handles from `start` to join.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    async fn timeframe_loop(
        ctx: Arc<EngineContext>,
        phases: Arc<Mutex<HashMap<String, TaskPhase>>>,
        mut shutdown: watch::Receiver<bool>,
        timeframe: Timeframe,
    ) {
        let cadence = timeframe
            .poll_interval(
                ctx.config.poll_interval_secs,
                ctx.config.daily_poll_interval_secs,
            )
            .max(Duration::from_secs(1));
        let mut ticker = tokio::time::interval(cadence);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            timeframe = %timeframe,
            cadence_secs = cadence.as_secs(),
            "MonitorScheduler: loop started for {} (every {}s)",
            timeframe,
            cadence.as_secs()
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    Self::run_tick(&ctx, &phases, timeframe).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(timeframe = %timeframe, "MonitorScheduler: loop stopped for {}", timeframe);
    }

    /// Run one evaluation pass for a timeframe right now, outside the loop
    /// cadence. The loops use this internally; it is also the catch-up hook
    /// for callers that know a tick is due (and the seam tests drive).
    pub async fn tick(&self, timeframe: Timeframe) {
        Self::run_tick(&self.ctx, &self.phases, timeframe).await;
    }

    async fn run_tick(
        ctx: &Arc<EngineContext>,
        phases: &Arc<Mutex<HashMap<String, TaskPhase>>>,
        timeframe: Timeframe,
    ) {
        // Snapshot eligible tasks for this timeframe and group them by
        // symbol so each group shares one bar window fetch.
        let records = ctx.store.load_all().await;
        let now = Instant::now();
        let mut groups: HashMap<String, Vec<TaskRecord>> = HashMap::new();
        {
            let mut phases = phases.lock().await;
            for record in records {
                if record.task.timeframe != timeframe {
                    continue;
                }
                let phase = phases
                    .entry(record.task.id.clone())
                    .or_insert(TaskPhase::Idle);
                match *phase {
                    TaskPhase::Failed { until } if now < until => continue,
                    TaskPhase::Evaluating => continue,
                    _ => {}
                }
                *phase = TaskPhase::Evaluating;
                groups
                    .entry(record.task.symbol.clone())
                    .or_default()
                    .push(record);
            }
        }

        if groups.is_empty() {
            return;
        }

        debug!(
            timeframe = %timeframe,
            groups = groups.len(),
            "MonitorScheduler: tick for {} with {} symbol groups",
            timeframe,
            groups.len()
        );

        // Independent (symbol, timeframe) groups evaluate in parallel.
        let futures = groups.into_iter().map(|(symbol, group)| {
            Self::evaluate_group(ctx.clone(), phases.clone(), symbol, timeframe, group)
        });
        futures_util::future::join_all(futures).await;
    }

    async fn evaluate_group(
        ctx: Arc<EngineContext>,
        phases: Arc<Mutex<HashMap<String, TaskPhase>>>,
        symbol: String,
        timeframe: Timeframe,
        group: Vec<TaskRecord>,
    ) {
        let min_count = group
            .iter()
            .map(|r| r.task.indicator.min_bars())
            .max()
            .unwrap_or(0);

        let bars = match ctx.cache.get_bars(&symbol, timeframe, min_count).await {
            Ok(bars) => bars,
            Err(EngineError::InsufficientData { have, need }) => {
                // Not an error state: the task stays Idle and is retried on
                // the next tick once the provider has enough history.
                debug!(
                    symbol = %symbol,
                    timeframe = %timeframe,
                    have,
                    need,
                    "MonitorScheduler: not enough bars yet for {}/{}",
                    symbol,
                    timeframe
                );
                Self::set_phases(&phases, &group, TaskPhase::Idle).await;
                return;
            }
            Err(e) => {
                warn!(
                    symbol = %symbol,
                    timeframe = %timeframe,
                    tasks = group.len(),
                    error = %e,
                    "MonitorScheduler: fetch failed for group {}/{}, backing off",
                    symbol,
                    timeframe
                );
                if let Some(ref metrics) = ctx.metrics {
                    metrics.evaluation_failures_total.inc_by(group.len() as u64);
                }
                let until = Instant::now()
                    + Duration::from_secs(ctx.config.failure_cooldown_secs);
                Self::set_phases(&phases, &group, TaskPhase::Failed { until }).await;
                return;
            }
        };

        // Tasks in the group share the fetched window, evaluated in order.
        for record in group {
            let task_id = record.task.id.clone();
            let phase = Self::evaluate_task(&ctx, &record, &bars).await;
            phases.lock().await.insert(task_id, phase);
        }
    }

    async fn set_phases(
        phases: &Arc<Mutex<HashMap<String, TaskPhase>>>,
        group: &[TaskRecord],
        phase: TaskPhase,
    ) {
        let mut phases = phases.lock().await;
        for record in group {
            phases.insert(record.task.id.clone(), phase);
        }
    }

    async fn evaluate_task(
        ctx: &Arc<EngineContext>,
        record: &TaskRecord,
        bars: &[Bar],
    ) -> TaskPhase {
        let start = Instant::now();
        if let Some(ref metrics) = ctx.metrics {
            metrics.evaluations_active.inc();
        }

        let result = Self::evaluate_task_inner(ctx, record, bars).await;

        if let Some(ref metrics) = ctx.metrics {
            metrics.evaluations_active.dec();
            metrics
                .evaluation_duration_seconds
                .observe(start.elapsed().as_secs_f64());
        }

        match result {
            Ok(()) => {
                if let Some(ref metrics) = ctx.metrics {
                    metrics.evaluations_total.inc();
                }
                TaskPhase::Idle
            }
            Err(EngineError::InsufficientData { have, need }) => {
                debug!(
                    task_id = %record.task.id,
                    have,
                    need,
                    "MonitorScheduler: task {} waiting for warmup",
                    record.task.id
                );
                TaskPhase::Idle
            }
            Err(e @ EngineError::Persistence(_)) => {
                // State was not advanced; the next tick retries the same
                // comparison (over-notifying beats losing a signal).
                error!(
                    task_id = %record.task.id,
                    error = %e,
                    "MonitorScheduler: state update failed for task {}",
                    record.task.id
                );
                if let Some(ref metrics) = ctx.metrics {
                    metrics.evaluation_failures_total.inc();
                }
                TaskPhase::Idle
            }
            Err(e) => {
                warn!(
                    task_id = %record.task.id,
                    error = %e,
                    "MonitorScheduler: evaluation failed for task {}, backing off",
                    record.task.id
                );
                if let Some(ref metrics) = ctx.metrics {
                    metrics.evaluation_failures_total.inc();
                }
                TaskPhase::Failed {
                    until: Instant::now()
                        + Duration::from_secs(ctx.config.failure_cooldown_secs),
                }
            }
        }
    }

    async fn evaluate_task_inner(
        ctx: &Arc<EngineContext>,
        record: &TaskRecord,
        bars: &[Bar],
    ) -> Result<(), EngineError> {
        let task = &record.task;
        let Some(newest) = bars.last() else {
            return Ok(());
        };

        // Nothing new since the last evaluation (or an out-of-order window):
        // skip without touching state, so an unclosed or duplicate bar can
        // never re-fire a signal.
        if let Some(last) = record.runtime.last_bar_ts {
            if newest.timestamp <= last {
                return Ok(());
            }
        }

        let series = indicators::compute(task.indicator, bars)?;
        let Some(point) = series.latest() else {
            return Ok(());
        };
        let snapshot = point.snapshot();
        let kind = signals::classify(record.runtime.last_snapshot.as_ref(), &snapshot);

        let mut next = TaskRuntimeState {
            last_bar_ts: Some(newest.timestamp),
            last_snapshot: Some(snapshot),
            last_signal: record.runtime.last_signal,
            last_signal_ts: record.runtime.last_signal_ts,
        };

        if kind != SignalKind::None {
            info!(
                task_id = %task.id,
                user_id = task.user_id,
                symbol = %task.symbol,
                timeframe = %task.timeframe,
                indicator = %task.indicator,
                kind = kind.as_str(),
                bar_ts = %newest.timestamp,
                "MonitorScheduler: {} on {} {} {} for task {}",
                kind.as_str(),
                task.symbol,
                task.timeframe,
                task.indicator,
                task.id
            );
            if let Some(ref metrics) = ctx.metrics {
                metrics
                    .signals_emitted_total
                    .with_label_values(&[kind.as_str()])
                    .inc();
            }
            ctx.dispatcher.dispatch(SignalEvent {
                task_id: task.id.clone(),
                user_id: task.user_id,
                symbol: task.symbol.clone(),
                timeframe: task.timeframe,
                indicator: task.indicator,
                kind,
                bar_ts: newest.timestamp,
                close: newest.close,
                snapshot,
            });
            next.last_signal = kind;
            next.last_signal_ts = Some(newest.timestamp);
        }

        // Dispatch has at least been attempted by this point; only now does
        // the persisted state advance past this bar.
        ctx.store.update_runtime(&task.id, next).await?;
        Ok(())
    }
}
