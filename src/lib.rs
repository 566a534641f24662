//! Podium - competitive rating and race outcome prediction
//!
//! This crate maintains Elo-style ratings for drivers and teams from a
//! multi-entrant contest history, turns those ratings into win probabilities
//! for upcoming contests, and scores issued predictions against the results.

pub mod config;
pub mod dataset;
pub mod error;
pub mod metrics;
pub mod prediction;
pub mod rating;
pub mod results;
pub mod service;
pub mod types;

// Re-export commonly used types and traits
pub use error::{EngineError, Result};
pub use types::*;

// Re-export key components
pub use prediction::{PredictionStore, Predictor};
pub use rating::{RatingStore, ReplayOutcome};
pub use results::ResultsStore;
pub use service::RatingService;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
