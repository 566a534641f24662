//! Rating system configuration

use crate::error::{EngineError, Result};
use crate::types::{BASE_RATING, RATING_FLOOR};
use serde::{Deserialize, Serialize};

/// Penalties applied to entrants that were not classified, as multiples of the
/// contest's K-factor. Every factor must exceed 1.0 so a non-finish always
/// costs more than the worst finishing result. `minimum_loss` bounds the
/// penalty from below in small fields, where the K-factor shrinks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusPenalties {
    pub retired: f64,
    pub dnf: f64,
    pub disqualified: f64,
    /// No unclassified entry loses fewer points than this
    pub minimum_loss: i32,
}

impl Default for StatusPenalties {
    fn default() -> Self {
        Self {
            retired: 1.10,
            dnf: 1.25,
            disqualified: 1.50,
            minimum_loss: 16,
        }
    }
}

/// Elo parameters shared by the calculator, update engine and replay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    /// Rating given to an entity on first appearance
    pub base_rating: i32,
    /// No rating may drop below this value
    pub rating_floor: i32,
    /// K-factor at the reference field size
    pub base_k_factor: f64,
    /// Field size at which `base_k_factor` applies unscaled
    pub reference_field_size: usize,
    pub penalties: StatusPenalties,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            base_rating: BASE_RATING,
            rating_floor: RATING_FLOOR,
            base_k_factor: 32.0,
            reference_field_size: 20,
            penalties: StatusPenalties::default(),
        }
    }
}

impl RatingConfig {
    /// Slower rating movement
    pub fn conservative() -> Self {
        Self {
            base_k_factor: 20.0,
            ..Self::default()
        }
    }

    /// Faster rating movement
    pub fn aggressive() -> Self {
        Self {
            base_k_factor: 48.0,
            ..Self::default()
        }
    }

    /// Configuration by preset name: `standard`, `conservative` or `aggressive`
    pub fn preset(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "standard" => Ok(Self::default()),
            "conservative" => Ok(Self::conservative()),
            "aggressive" => Ok(Self::aggressive()),
            _ => Err(EngineError::ConfigurationError {
                message: format!("Unknown rating preset: {}", name),
            }
            .into()),
        }
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        let fail = |message: &str| -> Result<()> {
            Err(EngineError::ConfigurationError {
                message: message.to_string(),
            }
            .into())
        };

        if self.rating_floor <= 0 {
            return fail("Rating floor must be positive");
        }
        if self.base_rating < self.rating_floor {
            return fail("Base rating must not be below the rating floor");
        }
        if !self.base_k_factor.is_finite() || self.base_k_factor <= 0.0 {
            return fail("Base K-factor must be positive");
        }
        if self.reference_field_size < 2 {
            return fail("Reference field size must be at least 2");
        }

        let penalties = &self.penalties;
        for factor in [penalties.retired, penalties.dnf, penalties.disqualified] {
            if !factor.is_finite() || factor <= 1.0 {
                return fail("Status penalty factors must be greater than 1.0");
            }
        }
        if penalties.minimum_loss <= 0 {
            return fail("Minimum non-finish loss must be positive");
        }
        if penalties.disqualified < penalties.retired {
            return fail("Disqualification penalty must be at least the retirement penalty");
        }

        Ok(())
    }
}
