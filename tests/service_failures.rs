//! Failure propagation through the rating service
//!
//! Store faults and invalid history must surface as errors without leaving
//! partial writes behind.

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::NaiveDate;
use mockall::mock;
use podium::config::AppConfig;
use podium::error::Result;
use podium::metrics::MetricsCollector;
use podium::prediction::{InMemoryPredictionStore, PredictionStore};
use podium::rating::{InMemoryRatingStore, RatingStore, ReplayOutcome};
use podium::results::ResultsStore;
use podium::types::{
    Contest, ContestEntry, ContestUpdate, EntityKind, Rating, RatingDelta, RatingSnapshot,
    UpcomingContest,
};
use podium::{EngineError, RatingService};
use std::sync::Arc;

mock! {
    pub Results {}

    #[async_trait]
    impl ResultsStore for Results {
        async fn contest(&self, contest_id: &str) -> Result<Option<Contest>>;
        async fn completed_contests(&self) -> Result<Vec<Contest>>;
        async fn upcoming_contests(&self) -> Result<Vec<UpcomingContest>>;
    }
}

mock! {
    pub Ratings {}

    #[async_trait]
    impl RatingStore for Ratings {
        async fn snapshot(&self) -> Result<RatingSnapshot>;
        async fn apply_update(&self, update: &ContestUpdate) -> Result<()>;
        async fn replace_all(&self, outcome: &ReplayOutcome) -> Result<()>;
        async fn is_applied(&self, contest_id: &str) -> Result<bool>;
        async fn audit_trail(&self, kind: EntityKind, entity_id: &str) -> Result<Vec<RatingDelta>>;
        async fn leaderboard(&self, kind: EntityKind, limit: usize) -> Result<Vec<Rating>>;
    }
}

fn contest(id: &str) -> Contest {
    Contest::new(
        id,
        NaiveDate::from_ymd_opt(2024, 4, 21).unwrap(),
        vec![
            ContestEntry::finished("ver", 1).with_team("red_bull"),
            ContestEntry::finished("lec", 2).with_team("ferrari"),
        ],
    )
    .unwrap()
}

fn service(
    ratings: Arc<dyn RatingStore>,
    results: Arc<dyn ResultsStore>,
    predictions: Arc<dyn PredictionStore>,
) -> RatingService {
    RatingService::new(
        AppConfig::default(),
        ratings,
        results,
        predictions,
        Arc::new(MetricsCollector::new().unwrap()),
    )
    .unwrap()
}

#[tokio::test]
async fn test_results_failure_aborts_update() {
    let mut results = MockResults::new();
    results
        .expect_contest()
        .returning(|_| Err(anyhow!("results database unavailable")));

    let mut ratings = MockRatings::new();
    ratings.expect_apply_update().never();

    let service = service(
        Arc::new(ratings),
        Arc::new(results),
        Arc::new(InMemoryPredictionStore::new()),
    );
    let err = service.update_contest("imola").await.unwrap_err();
    assert!(err.to_string().contains("unavailable"));
}

#[tokio::test]
async fn test_ratings_write_failure_is_reported() {
    let mut results = MockResults::new();
    results
        .expect_contest()
        .returning(|id| Ok(Some(contest(id))));

    let mut ratings = MockRatings::new();
    ratings.expect_is_applied().returning(|_| Ok(false));
    ratings
        .expect_snapshot()
        .returning(|| Ok(RatingSnapshot::new()));
    ratings.expect_apply_update().times(1).returning(|_| {
        Err(EngineError::StorageError {
            message: "disk full".to_string(),
        }
        .into())
    });

    let service = service(
        Arc::new(ratings),
        Arc::new(results),
        Arc::new(InMemoryPredictionStore::new()),
    );
    let err = service.update_contest("imola").await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EngineError>(),
        Some(EngineError::StorageError { .. })
    ));
    assert_eq!(
        service
            .metrics()
            .rating()
            .contests_applied_total
            .with_label_values(&["incremental"])
            .get(),
        0
    );
}

#[tokio::test]
async fn test_duplicate_history_blocks_recompute() {
    let mut results = MockResults::new();
    results
        .expect_completed_contests()
        .returning(|| Ok(vec![contest("imola"), contest("imola")]));

    let mut ratings = MockRatings::new();
    ratings.expect_replace_all().never();

    let service = service(
        Arc::new(ratings),
        Arc::new(results),
        Arc::new(InMemoryPredictionStore::new()),
    );
    let err = service.full_recompute().await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EngineError>(),
        Some(EngineError::InvalidContest { .. })
    ));
}

#[tokio::test]
async fn test_evaluating_missing_contest() {
    let mut results = MockResults::new();
    results.expect_contest().returning(|_| Ok(None));

    let service = service(
        Arc::new(InMemoryRatingStore::new()),
        Arc::new(results),
        Arc::new(InMemoryPredictionStore::new()),
    );
    let err = service.evaluate_contest("suzuka").await.unwrap_err();
    assert_eq!(
        err.downcast_ref::<EngineError>(),
        Some(&EngineError::ContestNotFound {
            contest_id: "suzuka".to_string()
        })
    );
}

#[tokio::test]
async fn test_schedule_failure_stores_no_predictions() {
    let mut results = MockResults::new();
    results
        .expect_upcoming_contests()
        .returning(|| Err(anyhow!("schedule feed timed out")));

    let predictions = Arc::new(InMemoryPredictionStore::new());
    let service = service(
        Arc::new(InMemoryRatingStore::new()),
        Arc::new(results),
        predictions.clone(),
    );

    assert!(service.predict_upcoming().await.is_err());
    assert!(predictions.predictions().unwrap().is_empty());
}
