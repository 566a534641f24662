//! Rating service coordinating the engine with its stores
//!
//! This is the surface an external scheduler calls: apply a newly completed
//! contest, rebuild every rating from history, issue predictions for upcoming
//! contests and score predictions once results are in. Full recompute and
//! incremental update both read-modify-write the ratings store, so they take
//! the same writer lock.

use crate::config::AppConfig;
use crate::error::{EngineError, Result};
use crate::metrics::{MetricsCollector, UpdateMode};
use crate::prediction::{evaluate, AccuracySummary, PredictionStore, Predictor};
use crate::rating::{apply_incremental, replay_history, RatingStore, ReplayOutcome};
use crate::results::ResultsStore;
use crate::types::{
    AccuracyRecord, ContestUpdate, EntityId, EntityKind, PredictionSet, Rating, RatingDelta,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Result of asking for one contest to be applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UpdateOutcome {
    Applied { update: ContestUpdate },
    /// The contest's deltas are already in the audit trail
    AlreadyApplied { contest_id: String },
}

/// Main rating service
pub struct RatingService {
    config: AppConfig,
    ratings: Arc<dyn RatingStore>,
    results: Arc<dyn ResultsStore>,
    predictions: Arc<dyn PredictionStore>,
    predictor: Predictor,
    metrics: Arc<MetricsCollector>,
    /// Serialises every read-modify-write of the ratings store
    writer: Mutex<()>,
}

impl RatingService {
    pub fn new(
        config: AppConfig,
        ratings: Arc<dyn RatingStore>,
        results: Arc<dyn ResultsStore>,
        predictions: Arc<dyn PredictionStore>,
        metrics: Arc<MetricsCollector>,
    ) -> Result<Self> {
        crate::config::validate_config(&config)?;
        let predictor = Predictor::new(config.prediction.clone(), config.rating.base_rating)?;

        info!(
            "Initializing {} with model {} (base rating {}, floor {}, K {})",
            config.service.name,
            config.prediction.model_version,
            config.rating.base_rating,
            config.rating.rating_floor,
            config.rating.base_k_factor
        );

        Ok(Self {
            config,
            ratings,
            results,
            predictions,
            predictor,
            metrics,
            writer: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    /// Apply one completed contest on top of the current ratings.
    ///
    /// A contest whose deltas are already recorded is skipped, so the trigger
    /// may safely fire more than once for the same result.
    pub async fn update_contest(&self, contest_id: &str) -> Result<UpdateOutcome> {
        let timer = self.metrics.start_timer();

        let contest = self
            .results
            .contest(contest_id)
            .await?
            .ok_or_else(|| EngineError::ContestNotFound {
                contest_id: contest_id.to_string(),
            })?;

        let _guard = self.writer.lock().await;

        if self.ratings.is_applied(contest_id).await? {
            warn!("Contest {} already applied, skipping", contest_id);
            self.metrics.record_contest_skipped();
            return Ok(UpdateOutcome::AlreadyApplied {
                contest_id: contest_id.to_string(),
            });
        }

        let snapshot = self.ratings.snapshot().await?;
        let (after, update) = apply_incremental(&snapshot, &contest, &self.config.rating);
        self.ratings.apply_update(&update).await?;

        self.metrics
            .record_contest_applied(UpdateMode::Incremental, &update);
        self.metrics
            .record_rated_population(after.drivers.len(), after.teams.len());
        self.metrics.record_update(timer.stop());

        info!(
            "Applied contest {} ({}): {} driver and {} team deltas",
            contest_id,
            contest.occurred_at(),
            update.drivers.len(),
            update.teams.len()
        );

        Ok(UpdateOutcome::Applied { update })
    }

    /// Reset every rating and replay the complete contest history
    pub async fn full_recompute(&self) -> Result<ReplayOutcome> {
        let timer = self.metrics.start_timer();
        let _guard = self.writer.lock().await;

        let history = self.results.completed_contests().await?;
        info!("Recomputing ratings from {} contests", history.len());

        let outcome = replay_history(&history, &self.config.rating)?;
        self.ratings.replace_all(&outcome).await?;

        for update in &outcome.updates {
            self.metrics
                .record_contest_applied(UpdateMode::Recompute, update);
        }
        self.metrics.record_rated_population(
            outcome.ratings.drivers.len(),
            outcome.ratings.teams.len(),
        );
        let elapsed = timer.stop();
        self.metrics
            .record_recompute(outcome.contests_replayed(), elapsed);

        info!(
            "Recompute finished in {:.2}ms: {} drivers, {} teams rated",
            elapsed.as_secs_f64() * 1000.0,
            outcome.ratings.drivers.len(),
            outcome.ratings.teams.len()
        );

        Ok(outcome)
    }

    /// Issue and store a prediction set for one contest
    pub async fn predict_contest(
        &self,
        contest_id: &str,
        roster: Option<&[EntityId]>,
    ) -> Result<PredictionSet> {
        let snapshot = self.ratings.snapshot().await?;
        let prediction = self.predictor.predict(&snapshot, contest_id, roster);

        if prediction.is_empty() {
            warn!("Prediction for {} has no entrants", contest_id);
        } else if let Some(favourite) = prediction.favourites(1).first() {
            debug!(
                "Predicted {} with {} entrants, favourite {} at {:.1}%",
                contest_id,
                prediction.entries.len(),
                favourite.entity_id,
                favourite.win_probability
            );
        }

        self.predictions.store_prediction(&prediction).await?;
        self.metrics.record_prediction();
        Ok(prediction)
    }

    /// Issue predictions for every upcoming contest
    pub async fn predict_upcoming(&self) -> Result<Vec<PredictionSet>> {
        let upcoming = self.results.upcoming_contests().await?;
        let mut predictions = Vec::with_capacity(upcoming.len());

        for contest in &upcoming {
            let prediction = self
                .predict_contest(&contest.contest_id, contest.roster.as_deref())
                .await?;
            predictions.push(prediction);
        }

        info!(
            "Issued {} predictions with model {}",
            predictions.len(),
            self.predictor.model_version()
        );
        Ok(predictions)
    }

    /// Score the stored prediction of a completed contest.
    ///
    /// Returns `None` when there is nothing to score: no prediction was issued
    /// for this model, or no entrant was classified. A contest whose rank-1
    /// finisher was excluded is still scored, with no winner to hit.
    pub async fn evaluate_contest(&self, contest_id: &str) -> Result<Option<AccuracyRecord>> {
        let contest = self
            .results
            .contest(contest_id)
            .await?
            .ok_or_else(|| EngineError::ContestNotFound {
                contest_id: contest_id.to_string(),
            })?;

        let model_version = self.predictor.model_version();
        let Some(prediction) = self.predictions.prediction(contest_id, model_version).await?
        else {
            debug!("No {} prediction for {}, skipping", model_version, contest_id);
            self.metrics.record_evaluation_skipped();
            return Ok(None);
        };

        let Some(record) = evaluate(&contest, &prediction, self.config.prediction.probability_clip)
        else {
            debug!("Nothing to score for {}, skipping", contest_id);
            self.metrics.record_evaluation_skipped();
            return Ok(None);
        };

        self.predictions.store_accuracy(&record).await?;
        self.metrics
            .record_evaluation(record.correct_winner, record.brier_score);

        info!(
            "Evaluated {}: brier {:.4}, log loss {:.4}, winner {}, top 3 {}",
            contest_id,
            record.brier_score,
            record.log_loss,
            record.correct_winner,
            record.top_3_accuracy
        );
        Ok(Some(record))
    }

    /// Score every completed contest that has a prediction
    pub async fn evaluate_completed(&self) -> Result<AccuracySummary> {
        let contests = self.results.completed_contests().await?;
        let mut records = Vec::new();

        for contest in &contests {
            if let Some(record) = self.evaluate_contest(contest.contest_id()).await? {
                records.push(record);
            }
        }

        let summary = AccuracySummary::from_records(&records);
        info!(
            "Evaluated {} of {} completed contests: mean brier {:.4}, winner hit rate {:.2}",
            summary.count,
            contests.len(),
            summary.mean_brier,
            summary.winner_hit_rate
        );
        Ok(summary)
    }

    /// Summary of the accuracy records already stored for `model_version`,
    /// defaulting to the configured model. Nothing is re-scored.
    pub async fn accuracy_report(&self, model_version: Option<&str>) -> Result<AccuracySummary> {
        let model_version = model_version.unwrap_or(self.predictor.model_version());
        let records = self.predictions.accuracy_records(model_version).await?;
        debug!("Loaded {} accuracy records for {}", records.len(), model_version);
        Ok(AccuracySummary::from_records(&records))
    }

    /// Highest ratings of one kind, `limit` defaulting to the configured size
    pub async fn leaderboard(&self, kind: EntityKind, limit: Option<usize>) -> Result<Vec<Rating>> {
        let limit = limit.unwrap_or(self.config.service.leaderboard_size);
        self.ratings.leaderboard(kind, limit).await
    }

    pub async fn audit_trail(&self, kind: EntityKind, entity_id: &str) -> Result<Vec<RatingDelta>> {
        self.ratings.audit_trail(kind, entity_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction::InMemoryPredictionStore;
    use crate::rating::InMemoryRatingStore;
    use crate::results::InMemoryResultsStore;
    use crate::types::{Contest, ContestEntry, UpcomingContest};
    use chrono::NaiveDate;

    struct Harness {
        service: RatingService,
        results: Arc<InMemoryResultsStore>,
        ratings: Arc<InMemoryRatingStore>,
    }

    fn harness() -> Harness {
        let results = Arc::new(InMemoryResultsStore::new());
        let ratings = Arc::new(InMemoryRatingStore::new());
        let service = RatingService::new(
            AppConfig::default(),
            ratings.clone(),
            results.clone(),
            Arc::new(InMemoryPredictionStore::new()),
            Arc::new(MetricsCollector::new().unwrap()),
        )
        .unwrap();
        Harness {
            service,
            results,
            ratings,
        }
    }

    fn contest(id: &str, day: u32, order: &[&str]) -> Contest {
        let entries = order
            .iter()
            .enumerate()
            .map(|(i, driver)| ContestEntry::finished(*driver, i as u32 + 1))
            .collect();
        Contest::new(id, NaiveDate::from_ymd_opt(2024, 4, day).unwrap(), entries).unwrap()
    }

    #[tokio::test]
    async fn test_update_is_applied_once() {
        let h = harness();
        h.results.add_contest(contest("r1", 7, &["a", "b", "c"])).unwrap();

        let first = h.service.update_contest("r1").await.unwrap();
        assert!(matches!(first, UpdateOutcome::Applied { .. }));
        let second = h.service.update_contest("r1").await.unwrap();
        assert!(matches!(second, UpdateOutcome::AlreadyApplied { .. }));

        assert_eq!(h.ratings.audit_len().unwrap(), 3);
        assert_eq!(
            h.service
                .metrics()
                .rating()
                .contests_skipped_total
                .get(),
            1
        );
    }

    #[tokio::test]
    async fn test_update_unknown_contest() {
        let h = harness();
        let err = h.service.update_contest("nowhere").await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<EngineError>(),
            Some(&EngineError::ContestNotFound {
                contest_id: "nowhere".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_recompute_matches_incremental_history() {
        let h = harness();
        h.results.add_contest(contest("r1", 7, &["a", "b", "c"])).unwrap();
        h.results.add_contest(contest("r2", 14, &["c", "a", "b"])).unwrap();

        h.service.update_contest("r1").await.unwrap();
        h.service.update_contest("r2").await.unwrap();
        let incremental = h.ratings.snapshot().await.unwrap();

        let outcome = h.service.full_recompute().await.unwrap();
        assert_eq!(outcome.ratings, incremental);
        assert_eq!(h.ratings.audit_len().unwrap(), 6);
    }

    #[tokio::test]
    async fn test_predict_then_evaluate() {
        let h = harness();
        h.results.add_contest(contest("r1", 7, &["a", "b", "c"])).unwrap();
        h.service.full_recompute().await.unwrap();

        h.results
            .add_upcoming(UpcomingContest {
                contest_id: "r2".to_string(),
                scheduled_for: NaiveDate::from_ymd_opt(2024, 4, 14).unwrap(),
                roster: None,
            })
            .unwrap();
        let predictions = h.service.predict_upcoming().await.unwrap();
        assert_eq!(predictions.len(), 1);
        assert_eq!(predictions[0].entries[0].entity_id, "a");

        h.results.add_contest(contest("r2", 14, &["a", "c", "b"])).unwrap();
        let record = h.service.evaluate_contest("r2").await.unwrap().unwrap();
        assert!(record.correct_winner);

        // r1 was never predicted
        assert!(h.service.evaluate_contest("r1").await.unwrap().is_none());
        let summary = h.service.evaluate_completed().await.unwrap();
        assert_eq!(summary.count, 1);
        assert_eq!(summary.winner_hit_rate, 1.0);
    }

    #[tokio::test]
    async fn test_update_sets_rated_population() {
        let h = harness();
        h.results.add_contest(contest("r1", 7, &["a", "b", "c"])).unwrap();
        h.results.add_contest(contest("r2", 14, &["d", "a"])).unwrap();

        h.service.update_contest("r1").await.unwrap();
        h.service.update_contest("r2").await.unwrap();

        let metrics = h.service.metrics();
        let drivers = metrics
            .rating()
            .rated_entities
            .with_label_values(&["driver"])
            .get();
        assert_eq!(drivers, 4);
        assert_eq!(h.ratings.snapshot().await.unwrap().drivers.len(), 4);
    }

    #[tokio::test]
    async fn test_accuracy_report_reads_stored_records() {
        let h = harness();
        h.results.add_contest(contest("r1", 7, &["a", "b", "c"])).unwrap();
        h.service.full_recompute().await.unwrap();
        h.service.predict_contest("r2", None).await.unwrap();
        h.results.add_contest(contest("r2", 14, &["b", "a", "c"])).unwrap();

        assert_eq!(h.service.accuracy_report(None).await.unwrap().count, 0);

        h.service.evaluate_contest("r2").await.unwrap().unwrap();
        let report = h.service.accuracy_report(None).await.unwrap();
        assert_eq!(report.count, 1);
        assert_eq!(report.winner_hit_rate, 0.0);
        assert_eq!(
            h.service.accuracy_report(Some("elo-v0")).await.unwrap(),
            AccuracySummary::default()
        );
    }

    #[tokio::test]
    async fn test_leaderboard_uses_configured_size() {
        let h = harness();
        let names: Vec<String> = (0..25).map(|i| format!("d{:02}", i)).collect();
        let order: Vec<&str> = names.iter().map(String::as_str).collect();
        h.results.add_contest(contest("r1", 7, &order)).unwrap();
        h.service.full_recompute().await.unwrap();

        let board = h.service.leaderboard(EntityKind::Driver, None).await.unwrap();
        assert_eq!(board.len(), 20);
        assert_eq!(board[0].entity_id, "d00");
        assert_eq!(
            h.service.leaderboard(EntityKind::Driver, Some(3)).await.unwrap().len(),
            3
        );
    }
}
