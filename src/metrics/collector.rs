//! Metrics collection using Prometheus
//!
//! Counters and histograms for rating updates, recomputes, predictions and
//! accuracy evaluation. Each collector owns its registry so several engines
//! (or tests) can run side by side.

use crate::types::{ContestUpdate, EntityKind};
use anyhow::Result;
use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge,
    IntGaugeVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How a contest's deltas reached the ratings store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    Incremental,
    Recompute,
}

impl UpdateMode {
    fn as_str(&self) -> &'static str {
        match self {
            UpdateMode::Incremental => "incremental",
            UpdateMode::Recompute => "recompute",
        }
    }
}

/// Main metrics collector for the rating engine
#[derive(Clone)]
pub struct MetricsCollector {
    registry: Arc<Registry>,
    rating_metrics: RatingMetrics,
    prediction_metrics: PredictionMetrics,
    performance_metrics: PerformanceMetrics,
}

/// Rating update metrics
#[derive(Clone)]
pub struct RatingMetrics {
    /// Contests applied, by update mode
    pub contests_applied_total: IntCounterVec,

    /// Incremental updates skipped because the contest was already applied
    pub contests_skipped_total: IntCounter,

    /// Rating deltas emitted, by entity kind
    pub deltas_total: IntCounterVec,

    /// Size of the rated population after the last write, by entity kind
    pub rated_entities: IntGaugeVec,

    /// Distribution of absolute rating changes
    pub rating_change: HistogramVec,
}

/// Prediction and accuracy metrics
#[derive(Clone)]
pub struct PredictionMetrics {
    /// Prediction sets issued
    pub predictions_total: IntCounter,

    /// Contests evaluated, by whether the favourite won
    pub evaluations_total: IntCounterVec,

    /// Evaluation skipped for lack of a prediction or a classified finisher
    pub evaluations_skipped_total: IntCounter,

    /// Brier score per evaluated contest
    pub brier_score: Histogram,
}

/// Performance metrics
#[derive(Clone)]
pub struct PerformanceMetrics {
    /// Full recompute wall time
    pub recompute_duration: Histogram,

    /// Single contest update wall time
    pub update_duration: Histogram,

    /// Contests in the last full recompute
    pub history_length: IntGauge,
}

impl MetricsCollector {
    /// Create a new metrics collector with its own registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let rating_metrics = RatingMetrics::new(&registry)?;
        let prediction_metrics = PredictionMetrics::new(&registry)?;
        let performance_metrics = PerformanceMetrics::new(&registry)?;

        Ok(Self {
            registry,
            rating_metrics,
            prediction_metrics,
            performance_metrics,
        })
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn rating(&self) -> &RatingMetrics {
        &self.rating_metrics
    }

    pub fn prediction(&self) -> &PredictionMetrics {
        &self.prediction_metrics
    }

    pub fn performance(&self) -> &PerformanceMetrics {
        &self.performance_metrics
    }

    /// Record one contest's batch reaching the store
    pub fn record_contest_applied(&self, mode: UpdateMode, update: &ContestUpdate) {
        self.rating_metrics
            .contests_applied_total
            .with_label_values(&[mode.as_str()])
            .inc();

        for delta in update.deltas() {
            let kind = match delta.kind {
                EntityKind::Driver => "driver",
                EntityKind::Team => "team",
            };
            self.rating_metrics
                .deltas_total
                .with_label_values(&[kind])
                .inc();
            self.rating_metrics
                .rating_change
                .with_label_values(&[kind])
                .observe(f64::from(delta.change.abs()));
        }
    }

    pub fn record_contest_skipped(&self) {
        self.rating_metrics.contests_skipped_total.inc();
    }

    pub fn record_rated_population(&self, drivers: usize, teams: usize) {
        self.rating_metrics
            .rated_entities
            .with_label_values(&["driver"])
            .set(drivers as i64);
        self.rating_metrics
            .rated_entities
            .with_label_values(&["team"])
            .set(teams as i64);
    }

    pub fn record_update(&self, duration: Duration) {
        self.performance_metrics
            .update_duration
            .observe(duration.as_secs_f64());
    }

    pub fn record_recompute(&self, contests: usize, duration: Duration) {
        self.performance_metrics.history_length.set(contests as i64);
        self.performance_metrics
            .recompute_duration
            .observe(duration.as_secs_f64());
    }

    pub fn record_prediction(&self) {
        self.prediction_metrics.predictions_total.inc();
    }

    /// Record an evaluated contest
    pub fn record_evaluation(&self, correct_winner: bool, brier_score: f64) {
        let outcome = if correct_winner { "hit" } else { "miss" };
        self.prediction_metrics
            .evaluations_total
            .with_label_values(&[outcome])
            .inc();
        self.prediction_metrics.brier_score.observe(brier_score);
    }

    pub fn record_evaluation_skipped(&self) {
        self.prediction_metrics.evaluations_skipped_total.inc();
    }

    /// Render every registered metric in the Prometheus text format
    pub fn export_text(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl RatingMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let contests_applied_total = IntCounterVec::new(
            Opts::new("podium_contests_applied_total", "Contests applied to ratings"),
            &["mode"],
        )?;
        registry.register(Box::new(contests_applied_total.clone()))?;

        let contests_skipped_total = IntCounter::new(
            "podium_contests_skipped_total",
            "Incremental updates skipped for already applied contests",
        )?;
        registry.register(Box::new(contests_skipped_total.clone()))?;

        let deltas_total = IntCounterVec::new(
            Opts::new("podium_rating_deltas_total", "Rating deltas emitted"),
            &["kind"],
        )?;
        registry.register(Box::new(deltas_total.clone()))?;

        let rated_entities = IntGaugeVec::new(
            Opts::new("podium_rated_entities", "Entities holding a rating"),
            &["kind"],
        )?;
        registry.register(Box::new(rated_entities.clone()))?;

        let rating_change = HistogramVec::new(
            HistogramOpts::new("podium_rating_change", "Absolute rating change per delta")
                .buckets(vec![1.0, 2.0, 5.0, 10.0, 20.0, 35.0, 50.0, 75.0]),
            &["kind"],
        )?;
        registry.register(Box::new(rating_change.clone()))?;

        Ok(Self {
            contests_applied_total,
            contests_skipped_total,
            deltas_total,
            rated_entities,
            rating_change,
        })
    }
}

impl PredictionMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let predictions_total =
            IntCounter::new("podium_predictions_total", "Prediction sets issued")?;
        registry.register(Box::new(predictions_total.clone()))?;

        let evaluations_total = IntCounterVec::new(
            Opts::new("podium_evaluations_total", "Predictions scored against results"),
            &["winner"],
        )?;
        registry.register(Box::new(evaluations_total.clone()))?;

        let evaluations_skipped_total = IntCounter::new(
            "podium_evaluations_skipped_total",
            "Contests with nothing to score",
        )?;
        registry.register(Box::new(evaluations_skipped_total.clone()))?;

        let brier_score = Histogram::with_opts(
            HistogramOpts::new("podium_brier_score", "Brier score per evaluated contest")
                .buckets(vec![0.01, 0.02, 0.05, 0.1, 0.2, 0.5, 1.0]),
        )?;
        registry.register(Box::new(brier_score.clone()))?;

        Ok(Self {
            predictions_total,
            evaluations_total,
            evaluations_skipped_total,
            brier_score,
        })
    }
}

impl PerformanceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let recompute_duration = Histogram::with_opts(
            HistogramOpts::new(
                "podium_recompute_duration_seconds",
                "Full history recompute time",
            )
            .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0]),
        )?;
        registry.register(Box::new(recompute_duration.clone()))?;

        let update_duration = Histogram::with_opts(
            HistogramOpts::new(
                "podium_update_duration_seconds",
                "Single contest update time",
            )
            .buckets(vec![0.0001, 0.001, 0.005, 0.01, 0.05, 0.1]),
        )?;
        registry.register(Box::new(update_duration.clone()))?;

        let history_length = IntGauge::new(
            "podium_history_length",
            "Contests replayed by the last full recompute",
        )?;
        registry.register(Box::new(history_length.clone()))?;

        Ok(Self {
            recompute_duration,
            update_duration,
            history_length,
        })
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new().expect("Failed to create default metrics collector")
    }
}
