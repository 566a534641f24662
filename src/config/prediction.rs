//! Prediction and accuracy configuration

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    /// Tag stored with every issued prediction set
    pub model_version: String,
    /// Rating gap that multiplies win odds by ten
    pub rating_scale: f64,
    /// Probabilities are clipped to `[clip, 1 - clip]` before taking logs
    pub probability_clip: f64,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            model_version: "elo-v1".to_string(),
            rating_scale: 400.0,
            probability_clip: 1e-4,
        }
    }
}

impl PredictionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.model_version.trim().is_empty() {
            return Err(EngineError::ConfigurationError {
                message: "Model version cannot be empty".to_string(),
            }
            .into());
        }
        if !self.rating_scale.is_finite() || self.rating_scale <= 0.0 {
            return Err(EngineError::ConfigurationError {
                message: "Rating scale must be positive".to_string(),
            }
            .into());
        }
        if !(self.probability_clip > 0.0 && self.probability_clip < 0.5) {
            return Err(EngineError::ConfigurationError {
                message: "Probability clip must be in (0, 0.5)".to_string(),
            }
            .into());
        }
        Ok(())
    }
}
