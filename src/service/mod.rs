//! Service layer for the podium rating engine
//!
//! Coordinates the rating engine, predictor and evaluator with the ratings,
//! results and prediction stores.

pub mod rating_service;

pub use rating_service::{RatingService, UpdateOutcome};
