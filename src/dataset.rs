//! JSON dataset files backing the command line tool
//!
//! A dataset holds everything the in-memory stores need: completed contests,
//! the schedule of upcoming contests, current ratings with their audit trail,
//! issued predictions and accuracy records. Contests are validated as they are
//! read, so a malformed result is rejected before any store sees it.

use crate::error::Result;
use crate::prediction::{InMemoryPredictionStore, PredictionStore};
use crate::rating::{InMemoryRatingStore, ReplayOutcome};
use crate::results::{InMemoryResultsStore, ResultsStore};
use crate::types::{AccuracyRecord, Contest, PredictionSet, UpcomingContest};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// On-disk dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dataset {
    pub contests: Vec<Contest>,
    pub upcoming: Vec<UpcomingContest>,
    pub ratings: ReplayOutcome,
    pub predictions: Vec<PredictionSet>,
    pub accuracy: Vec<AccuracyRecord>,
}

/// The in-memory stores a dataset loads into
#[derive(Debug, Clone)]
pub struct DatasetStores {
    pub ratings: Arc<InMemoryRatingStore>,
    pub results: Arc<InMemoryResultsStore>,
    pub predictions: Arc<InMemoryPredictionStore>,
}

impl Dataset {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dataset {}", path.display()))?;
        let dataset: Dataset = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse dataset {}", path.display()))?;
        Ok(dataset)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write dataset {}", path.display()))?;
        Ok(())
    }

    /// Populate fresh in-memory stores
    pub async fn into_stores(self) -> Result<DatasetStores> {
        let results = Arc::new(InMemoryResultsStore::new());
        for contest in self.contests {
            results.add_contest(contest)?;
        }
        for upcoming in self.upcoming {
            results.add_upcoming(upcoming)?;
        }

        let predictions = Arc::new(InMemoryPredictionStore::new());
        for prediction in &self.predictions {
            predictions.store_prediction(prediction).await?;
        }
        for record in &self.accuracy {
            predictions.store_accuracy(record).await?;
        }

        Ok(DatasetStores {
            ratings: Arc::new(InMemoryRatingStore::from_outcome(self.ratings)),
            results,
            predictions,
        })
    }

    /// Capture the current contents of the stores
    pub async fn from_stores(stores: &DatasetStores) -> Result<Self> {
        Ok(Self {
            contests: stores.results.completed_contests().await?,
            upcoming: stores.results.upcoming_contests().await?,
            ratings: stores.ratings.export()?,
            predictions: stores.predictions.predictions()?,
            accuracy: stores.predictions.accuracy()?,
        })
    }
}
