//! Rating storage interface and implementations
//!
//! This module defines the boundary to the ratings store: it supplies snapshots,
//! accepts delta batches as the new current ratings plus an append-only audit
//! trail, and is reset wholesale by a full recompute.

use crate::error::{EngineError, Result};
use crate::rating::replay::ReplayOutcome;
use crate::types::{ContestId, ContestUpdate, EntityKind, Rating, RatingDelta, RatingSnapshot};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::RwLock;

/// Trait for rating storage operations
#[async_trait]
pub trait RatingStore: Send + Sync {
    /// Current rating of every rated entity
    async fn snapshot(&self) -> Result<RatingSnapshot>;

    /// Persist one contest's batch: new current ratings plus audit records
    async fn apply_update(&self, update: &ContestUpdate) -> Result<()>;

    /// Replace all ratings and the audit trail with a full replay
    async fn replace_all(&self, outcome: &ReplayOutcome) -> Result<()>;

    /// Whether the contest's batch is already in the audit trail
    async fn is_applied(&self, contest_id: &str) -> Result<bool>;

    /// Audit records of one entity, oldest first
    async fn audit_trail(&self, kind: EntityKind, entity_id: &str) -> Result<Vec<RatingDelta>>;

    /// Highest ratings of one kind
    async fn leaderboard(&self, kind: EntityKind, limit: usize) -> Result<Vec<Rating>>;
}

#[derive(Debug, Default)]
struct RatingState {
    snapshot: RatingSnapshot,
    /// Audit trail, one batch per applied contest
    updates: Vec<ContestUpdate>,
    applied: BTreeSet<ContestId>,
}

/// In-memory rating storage implementation
#[derive(Debug, Default)]
pub struct InMemoryRatingStore {
    state: RwLock<RatingState>,
}

impl InMemoryRatingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing current ratings with an empty audit trail
    pub fn with_snapshot(snapshot: RatingSnapshot) -> Self {
        Self {
            state: RwLock::new(RatingState {
                snapshot,
                ..RatingState::default()
            }),
        }
    }

    /// Restore the ratings and audit trail of an earlier replay or export
    pub fn from_outcome(outcome: ReplayOutcome) -> Self {
        let applied = outcome
            .updates
            .iter()
            .map(|update| update.contest_id.clone())
            .collect();
        Self {
            state: RwLock::new(RatingState {
                snapshot: outcome.ratings,
                updates: outcome.updates,
                applied,
            }),
        }
    }

    /// Current ratings plus the full audit trail, in application order
    pub fn export(&self) -> Result<ReplayOutcome> {
        let state = self.read()?;
        Ok(ReplayOutcome {
            ratings: state.snapshot.clone(),
            updates: state.updates.clone(),
        })
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, RatingState>> {
        self.state.read().map_err(|_| {
            EngineError::StorageError {
                message: "Failed to acquire ratings read lock".to_string(),
            }
            .into()
        })
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, RatingState>> {
        self.state.write().map_err(|_| {
            EngineError::StorageError {
                message: "Failed to acquire ratings write lock".to_string(),
            }
            .into()
        })
    }

    /// Number of audit records held (for testing)
    pub fn audit_len(&self) -> Result<usize> {
        Ok(self.read()?.updates.iter().map(ContestUpdate::len).sum())
    }
}

#[async_trait]
impl RatingStore for InMemoryRatingStore {
    async fn snapshot(&self) -> Result<RatingSnapshot> {
        Ok(self.read()?.snapshot.clone())
    }

    async fn apply_update(&self, update: &ContestUpdate) -> Result<()> {
        let mut state = self.write()?;
        state.snapshot.apply(update);
        state.updates.push(update.clone());
        state.applied.insert(update.contest_id.clone());
        Ok(())
    }

    async fn replace_all(&self, outcome: &ReplayOutcome) -> Result<()> {
        let mut state = self.write()?;
        state.snapshot = outcome.ratings.clone();
        state.updates = outcome.updates.clone();
        state.applied = outcome
            .updates
            .iter()
            .map(|update| update.contest_id.clone())
            .collect();
        Ok(())
    }

    async fn is_applied(&self, contest_id: &str) -> Result<bool> {
        Ok(self.read()?.applied.contains(contest_id))
    }

    async fn audit_trail(&self, kind: EntityKind, entity_id: &str) -> Result<Vec<RatingDelta>> {
        Ok(self
            .read()?
            .updates
            .iter()
            .flat_map(|update| update.deltas())
            .filter(|delta| delta.kind == kind && delta.entity_id == entity_id)
            .cloned()
            .collect())
    }

    async fn leaderboard(&self, kind: EntityKind, limit: usize) -> Result<Vec<Rating>> {
        let mut ratings = self.read()?.snapshot.ranked(kind);
        ratings.truncate(limit);
        Ok(ratings)
    }
}
