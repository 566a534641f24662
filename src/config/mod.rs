//! Configuration management for the podium rating engine
//!
//! This module handles configuration loading from environment variables and
//! TOML files, validation, and default values for the engine.

pub mod app;
pub mod prediction;
pub mod rating;

// Re-export commonly used types
pub use app::{validate_config, AppConfig, ServiceSettings};
pub use prediction::PredictionConfig;
pub use rating::{RatingConfig, StatusPenalties};
