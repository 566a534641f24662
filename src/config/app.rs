//! Main application configuration
//!
//! This module defines the primary configuration structures for the podium
//! rating engine, including environment variable and TOML file loading and
//! validation.

use crate::config::prediction::PredictionConfig;
use crate::config::rating::RatingConfig;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub rating: RatingConfig,
    pub prediction: PredictionConfig,
}

/// Service-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Number of entries printed by the leaderboard command
    pub leaderboard_size: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "podium".to_string(),
            log_level: "info".to_string(),
            leaderboard_size: 20,
        }
    }
}

fn parse_env<T: FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("Invalid {} value: {}", name, value)),
        Err(_) => Ok(None),
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // Service settings
        if let Ok(name) = env::var("PODIUM_SERVICE_NAME") {
            config.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.service.log_level = log_level;
        }
        if let Some(size) = parse_env("PODIUM_LEADERBOARD_SIZE")? {
            config.service.leaderboard_size = size;
        }

        // Rating settings, starting from the named preset if any
        if let Ok(preset) = env::var("PODIUM_RATING_PRESET") {
            config.rating = RatingConfig::preset(&preset)?;
        }
        if let Some(base) = parse_env("PODIUM_BASE_RATING")? {
            config.rating.base_rating = base;
        }
        if let Some(floor) = parse_env("PODIUM_RATING_FLOOR")? {
            config.rating.rating_floor = floor;
        }
        if let Some(k) = parse_env("PODIUM_K_FACTOR")? {
            config.rating.base_k_factor = k;
        }
        if let Some(field) = parse_env("PODIUM_REFERENCE_FIELD_SIZE")? {
            config.rating.reference_field_size = field;
        }

        // Prediction settings
        if let Ok(version) = env::var("PODIUM_MODEL_VERSION") {
            config.prediction.model_version = version;
        }
        if let Some(scale) = parse_env("PODIUM_RATING_SCALE")? {
            config.prediction.rating_scale = scale;
        }

        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        validate_config(&config)?;
        Ok(config)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.name.is_empty() {
        return Err(anyhow!("Service name cannot be empty"));
    }
    if config.service.leaderboard_size == 0 {
        return Err(anyhow!("Leaderboard size must be greater than 0"));
    }

    config.rating.validate()?;
    config.prediction.validate()?;

    Ok(())
}
