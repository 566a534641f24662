//! Win-probability prediction from a rating snapshot

use crate::config::PredictionConfig;
use crate::error::Result;
use crate::types::{EntityId, EntityKind, PredictionEntry, PredictionSet, RatingSnapshot};
use std::collections::HashSet;

/// Convert ratings into win percentages that sum to 100.
///
/// Each entrant's weight is `10^(rating / scale)`, the multi-entrant form of the
/// Elo odds, shifted by the field maximum so large ratings cannot overflow.
/// Strictly higher ratings always get strictly higher probabilities.
pub fn win_probabilities(ratings: &[i32], rating_scale: f64) -> Vec<f64> {
    let Some(max) = ratings.iter().max().copied() else {
        return Vec::new();
    };

    let weights: Vec<f64> = ratings
        .iter()
        .map(|&rating| 10f64.powf((f64::from(rating) - f64::from(max)) / rating_scale))
        .collect();
    let total: f64 = weights.iter().sum();

    weights.iter().map(|weight| 100.0 * weight / total).collect()
}

/// Issues prediction sets for upcoming contests
#[derive(Debug, Clone)]
pub struct Predictor {
    config: PredictionConfig,
    base_rating: i32,
}

impl Predictor {
    /// Create a predictor. Unrated roster members are predicted at `base_rating`.
    pub fn new(config: PredictionConfig, base_rating: i32) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            base_rating,
        })
    }

    pub fn model_version(&self) -> &str {
        &self.config.model_version
    }

    /// Predict the winner of `contest_id`.
    ///
    /// With a roster, exactly the roster's drivers are predicted (duplicates
    /// dropped). Without one, every rated driver is. Entries come back most
    /// likely first, ties by id. An empty roster gives an empty set.
    pub fn predict(
        &self,
        snapshot: &RatingSnapshot,
        contest_id: &str,
        roster: Option<&[EntityId]>,
    ) -> PredictionSet {
        let field: Vec<(EntityId, i32)> = match roster {
            Some(roster) => {
                let mut seen = HashSet::new();
                roster
                    .iter()
                    .filter(|entity_id| seen.insert(entity_id.as_str()))
                    .map(|entity_id| {
                        let rating =
                            snapshot.rating_or(EntityKind::Driver, entity_id, self.base_rating);
                        (entity_id.clone(), rating)
                    })
                    .collect()
            }
            None => snapshot
                .drivers
                .iter()
                .map(|(entity_id, rating)| (entity_id.clone(), *rating))
                .collect(),
        };

        let ratings: Vec<i32> = field.iter().map(|(_, rating)| *rating).collect();
        let probabilities = win_probabilities(&ratings, self.config.rating_scale);

        let mut entries: Vec<PredictionEntry> = field
            .into_iter()
            .zip(probabilities)
            .map(|((entity_id, rating), win_probability)| PredictionEntry {
                entity_id,
                rating,
                win_probability,
            })
            .collect();
        entries.sort_by(|a, b| {
            b.rating
                .cmp(&a.rating)
                .then_with(|| a.entity_id.cmp(&b.entity_id))
        });

        PredictionSet {
            contest_id: contest_id.to_string(),
            model_version: self.config.model_version.clone(),
            entries,
        }
    }
}
