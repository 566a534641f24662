//! History replay and recomputation
//!
//! Drives the update engine forward through time. Incremental mode applies a
//! single contest to the current ratings; full recompute resets every entity
//! to unrated and folds the whole history in date order. The fold is
//! sequential since each contest starts from the previous contest's output.

use crate::config::RatingConfig;
use crate::error::{EngineError, Result};
use crate::rating::engine::update_contest;
use crate::types::{Contest, ContestUpdate, RatingDelta, RatingSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Final ratings and per-contest audit batches of a full replay
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayOutcome {
    pub ratings: RatingSnapshot,
    /// One batch per replayed contest, in replay order
    pub updates: Vec<ContestUpdate>,
}

impl ReplayOutcome {
    pub fn contests_replayed(&self) -> usize {
        self.updates.len()
    }

    /// Every delta in replay order
    pub fn deltas(&self) -> impl Iterator<Item = &RatingDelta> {
        self.updates.iter().flat_map(|update| update.deltas())
    }
}

/// Apply one contest on top of `snapshot`, returning the new ratings and the batch
pub fn apply_incremental(
    snapshot: &RatingSnapshot,
    contest: &Contest,
    config: &RatingConfig,
) -> (RatingSnapshot, ContestUpdate) {
    let update = update_contest(contest, snapshot, config);
    let mut next = snapshot.clone();
    next.apply(&update);
    (next, update)
}

/// Contests in replay order: ascending date, same-day contests by id
pub fn chronological(contests: &[Contest]) -> Vec<&Contest> {
    let mut ordered: Vec<&Contest> = contests.iter().collect();
    ordered.sort_by(|a, b| {
        a.occurred_at()
            .cmp(&b.occurred_at())
            .then_with(|| a.contest_id().cmp(b.contest_id()))
    });
    ordered
}

/// Reset every rating and replay the full history.
///
/// Deterministic: the same history always yields identical ratings and deltas,
/// whatever order the contests are supplied in. A contest id appearing twice
/// is rejected.
pub fn replay_history(contests: &[Contest], config: &RatingConfig) -> Result<ReplayOutcome> {
    let mut seen = HashSet::new();
    for contest in contests {
        if !seen.insert(contest.contest_id()) {
            return Err(EngineError::InvalidContest {
                contest_id: contest.contest_id().to_string(),
                reason: "contest appears more than once in history".to_string(),
            }
            .into());
        }
    }

    let mut outcome = ReplayOutcome::default();
    for contest in chronological(contests) {
        let update = update_contest(contest, &outcome.ratings, config);
        debug!(
            "Replayed contest {} ({}): {} driver and {} team deltas",
            contest.contest_id(),
            contest.occurred_at(),
            update.drivers.len(),
            update.teams.len()
        );
        outcome.ratings.apply(&update);
        outcome.updates.push(update);
    }

    Ok(outcome)
}
