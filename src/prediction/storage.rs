//! Prediction storage interface
//!
//! Prediction sets are keyed by `(contest_id, model_version)` so several models
//! can be issued and scored side by side for the same contest.

use crate::error::{EngineError, Result};
use crate::types::{AccuracyRecord, ContestId, PredictionSet};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::RwLock;

#[async_trait]
pub trait PredictionStore: Send + Sync {
    /// Store a prediction set, replacing any earlier set for the same contest and model
    async fn store_prediction(&self, prediction: &PredictionSet) -> Result<()>;

    async fn prediction(&self, contest_id: &str, model_version: &str)
        -> Result<Option<PredictionSet>>;

    /// Store an accuracy record, replacing any earlier score of the same prediction
    async fn store_accuracy(&self, record: &AccuracyRecord) -> Result<()>;

    /// Every accuracy record of one model, ordered by contest id
    async fn accuracy_records(&self, model_version: &str) -> Result<Vec<AccuracyRecord>>;
}

type PredictionKey = (ContestId, String);

/// In-memory prediction store
#[derive(Debug, Default)]
pub struct InMemoryPredictionStore {
    predictions: RwLock<BTreeMap<PredictionKey, PredictionSet>>,
    accuracy: RwLock<BTreeMap<PredictionKey, AccuracyRecord>>,
}

impl InMemoryPredictionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored prediction set (for export)
    pub fn predictions(&self) -> Result<Vec<PredictionSet>> {
        let predictions = self.predictions.read().map_err(|_| EngineError::StorageError {
            message: "Failed to acquire predictions read lock".to_string(),
        })?;
        Ok(predictions.values().cloned().collect())
    }

    /// Every stored accuracy record across all models (for export)
    pub fn accuracy(&self) -> Result<Vec<AccuracyRecord>> {
        let accuracy = self.accuracy.read().map_err(|_| EngineError::StorageError {
            message: "Failed to acquire accuracy read lock".to_string(),
        })?;
        Ok(accuracy.values().cloned().collect())
    }
}

#[async_trait]
impl PredictionStore for InMemoryPredictionStore {
    async fn store_prediction(&self, prediction: &PredictionSet) -> Result<()> {
        let mut predictions = self.predictions.write().map_err(|_| EngineError::StorageError {
            message: "Failed to acquire predictions write lock".to_string(),
        })?;
        predictions.insert(
            (
                prediction.contest_id.clone(),
                prediction.model_version.clone(),
            ),
            prediction.clone(),
        );
        Ok(())
    }

    async fn prediction(
        &self,
        contest_id: &str,
        model_version: &str,
    ) -> Result<Option<PredictionSet>> {
        let predictions = self.predictions.read().map_err(|_| EngineError::StorageError {
            message: "Failed to acquire predictions read lock".to_string(),
        })?;
        Ok(predictions
            .get(&(contest_id.to_string(), model_version.to_string()))
            .cloned())
    }

    async fn store_accuracy(&self, record: &AccuracyRecord) -> Result<()> {
        let mut accuracy = self.accuracy.write().map_err(|_| EngineError::StorageError {
            message: "Failed to acquire accuracy write lock".to_string(),
        })?;
        accuracy.insert(
            (record.contest_id.clone(), record.model_version.clone()),
            record.clone(),
        );
        Ok(())
    }

    async fn accuracy_records(&self, model_version: &str) -> Result<Vec<AccuracyRecord>> {
        let accuracy = self.accuracy.read().map_err(|_| EngineError::StorageError {
            message: "Failed to acquire accuracy read lock".to_string(),
        })?;
        Ok(accuracy
            .values()
            .filter(|record| record.model_version == model_version)
            .cloned()
            .collect())
    }
}
