//! Metrics for the rating engine
//!
//! Prometheus counters and histograms covering rating updates, recomputes,
//! prediction issue and accuracy scoring.

pub mod collector;

pub use collector::{
    MetricsCollector, MetricsTimer, PerformanceMetrics, PredictionMetrics, RatingMetrics,
    UpdateMode,
};
