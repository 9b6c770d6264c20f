//! Prometheus metrics for the monitoring engine

use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};

pub struct Metrics {
    pub registry: Registry,
    pub evaluations_total: IntCounter,
    pub evaluation_failures_total: IntCounter,
    pub evaluations_active: IntGauge,
    pub evaluation_duration_seconds: Histogram,
    pub signals_emitted_total: IntCounterVec,
    pub notifications_dropped_total: IntCounter,
    pub provider_fetches_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let evaluations_total = IntCounter::new(
            "task_evaluations_total",
            "Completed task evaluations",
        )?;
        let evaluation_failures_total = IntCounter::new(
            "task_evaluation_failures_total",
            "Task evaluations that failed (provider or persistence)",
        )?;
        let evaluations_active = IntGauge::new(
            "task_evaluations_active",
            "Task evaluations currently in flight",
        )?;
        let evaluation_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "task_evaluation_duration_seconds",
            "Wall time of one task evaluation",
        ))?;
        let signals_emitted_total = IntCounterVec::new(
            Opts::new("signals_emitted_total", "Crossover signals emitted"),
            &["kind"],
        )?;
        let notifications_dropped_total = IntCounter::new(
            "notifications_dropped_total",
            "Notifications dropped after exhausting retries",
        )?;
        let provider_fetches_total = IntCounter::new(
            "provider_fetches_total",
            "Bar window fetches issued to the market data provider",
        )?;

        registry.register(Box::new(evaluations_total.clone()))?;
        registry.register(Box::new(evaluation_failures_total.clone()))?;
        registry.register(Box::new(evaluations_active.clone()))?;
        registry.register(Box::new(evaluation_duration_seconds.clone()))?;
        registry.register(Box::new(signals_emitted_total.clone()))?;
        registry.register(Box::new(notifications_dropped_total.clone()))?;
        registry.register(Box::new(provider_fetches_total.clone()))?;

        Ok(Self {
            registry,
            evaluations_total,
            evaluation_failures_total,
            evaluations_active,
            evaluation_duration_seconds,
            signals_emitted_total,
            notifications_dropped_total,
            provider_fetches_total,
        })
    }
}
