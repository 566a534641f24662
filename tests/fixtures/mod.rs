//! Test fixtures for integration testing
//!
//! A deterministic ten-driver season plus a rating store wrapper that counts
//! writes, so tests can assert how often the service touched the store.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use podium::config::AppConfig;
use podium::error::Result;
use podium::metrics::MetricsCollector;
use podium::prediction::InMemoryPredictionStore;
use podium::rating::{InMemoryRatingStore, RatingStore, ReplayOutcome};
use podium::results::InMemoryResultsStore;
use podium::types::{
    Contest, ContestEntry, ContestUpdate, EntityKind, Placement, Rating, RatingDelta,
    RatingSnapshot, UpcomingContest,
};
use podium::RatingService;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Drivers and their teams, strongest first
pub const GRID: [(&str, &str); 10] = [
    ("ver", "red_bull"),
    ("per", "red_bull"),
    ("lec", "ferrari"),
    ("sai", "ferrari"),
    ("nor", "mclaren"),
    ("pia", "mclaren"),
    ("ham", "mercedes"),
    ("rus", "mercedes"),
    ("alo", "aston_martin"),
    ("str", "aston_martin"),
];

pub fn season_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()
}

pub fn round_id(round: usize) -> String {
    format!("round-{:02}", round)
}

pub fn round_date(round: usize) -> NaiveDate {
    season_start()
        .checked_add_days(Days::new(7 * round as u64))
        .unwrap()
}

/// Grid order with neighbouring pairs swapped on a fixed pattern.
/// The favourite wins two rounds in three.
pub fn finishing_order(round: usize) -> Vec<&'static str> {
    let mut order: Vec<&'static str> = GRID.iter().map(|(driver, _)| *driver).collect();
    for pair in (0..order.len() - 1).step_by(2) {
        if (round + pair) % 3 == 0 {
            order.swap(pair, pair + 1);
        }
    }
    order
}

fn team_of(driver: &str) -> &'static str {
    GRID.iter()
        .find(|(id, _)| *id == driver)
        .map(|(_, team)| *team)
        .unwrap()
}

/// One round's result. Every fourth round the last car fails to finish.
pub fn round(round: usize) -> Contest {
    let order = finishing_order(round);
    let last = order.len() - 1;
    let entries = order
        .iter()
        .enumerate()
        .map(|(position, driver)| {
            let placement = if round % 4 == 3 && position == last {
                Placement::Dnf
            } else {
                Placement::Classified {
                    rank: position as u32 + 1,
                }
            };
            ContestEntry::new(*driver, placement).with_team(team_of(driver))
        })
        .collect();
    Contest::new(round_id(round), round_date(round), entries).unwrap()
}

/// Rounds `0..rounds`
pub fn season(rounds: usize) -> Vec<Contest> {
    (0..rounds).map(round).collect()
}

pub fn upcoming(round: usize, roster: Option<Vec<&str>>) -> UpcomingContest {
    UpcomingContest {
        contest_id: round_id(round),
        scheduled_for: round_date(round),
        roster: roster.map(|ids| ids.into_iter().map(String::from).collect()),
    }
}

/// Rating store that counts writes
#[derive(Debug, Default)]
pub struct RecordingRatingStore {
    inner: InMemoryRatingStore,
    updates_applied: AtomicUsize,
    replacements: AtomicUsize,
}

impl RecordingRatingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates_applied(&self) -> usize {
        self.updates_applied.load(Ordering::SeqCst)
    }

    pub fn replacements(&self) -> usize {
        self.replacements.load(Ordering::SeqCst)
    }

    pub fn audit_len(&self) -> usize {
        self.inner.audit_len().unwrap()
    }
}

#[async_trait]
impl RatingStore for RecordingRatingStore {
    async fn snapshot(&self) -> Result<RatingSnapshot> {
        self.inner.snapshot().await
    }

    async fn apply_update(&self, update: &ContestUpdate) -> Result<()> {
        self.updates_applied.fetch_add(1, Ordering::SeqCst);
        self.inner.apply_update(update).await
    }

    async fn replace_all(&self, outcome: &ReplayOutcome) -> Result<()> {
        self.replacements.fetch_add(1, Ordering::SeqCst);
        self.inner.replace_all(outcome).await
    }

    async fn is_applied(&self, contest_id: &str) -> Result<bool> {
        self.inner.is_applied(contest_id).await
    }

    async fn audit_trail(&self, kind: EntityKind, entity_id: &str) -> Result<Vec<RatingDelta>> {
        self.inner.audit_trail(kind, entity_id).await
    }

    async fn leaderboard(&self, kind: EntityKind, limit: usize) -> Result<Vec<Rating>> {
        self.inner.leaderboard(kind, limit).await
    }
}

/// Complete system over in-memory stores
pub struct TestSystem {
    pub service: Arc<RatingService>,
    pub ratings: Arc<RecordingRatingStore>,
    pub results: Arc<InMemoryResultsStore>,
    pub predictions: Arc<InMemoryPredictionStore>,
}

pub fn create_test_system(history: Vec<Contest>) -> TestSystem {
    let ratings = Arc::new(RecordingRatingStore::new());
    let results = Arc::new(InMemoryResultsStore::new());
    let predictions = Arc::new(InMemoryPredictionStore::new());
    for contest in history {
        results.add_contest(contest).unwrap();
    }

    let service = RatingService::new(
        AppConfig::default(),
        ratings.clone(),
        results.clone(),
        predictions.clone(),
        Arc::new(MetricsCollector::new().unwrap()),
    )
    .unwrap();

    TestSystem {
        service: Arc::new(service),
        ratings,
        results,
        predictions,
    }
}
