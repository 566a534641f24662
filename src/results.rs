//! Results storage interface
//!
//! The results store supplies validated contests, either one by id or the whole
//! completed history in chronological order, plus the schedule of upcoming
//! contests to predict.

use crate::error::{EngineError, Result};
use crate::rating::replay::chronological;
use crate::types::{Contest, ContestId, UpcomingContest};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::RwLock;

#[async_trait]
pub trait ResultsStore: Send + Sync {
    /// A completed contest by id
    async fn contest(&self, contest_id: &str) -> Result<Option<Contest>>;

    /// Every completed contest, oldest first
    async fn completed_contests(&self) -> Result<Vec<Contest>>;

    /// Contests still to run, soonest first
    async fn upcoming_contests(&self) -> Result<Vec<UpcomingContest>>;
}

/// In-memory results store
#[derive(Debug, Default)]
pub struct InMemoryResultsStore {
    completed: RwLock<BTreeMap<ContestId, Contest>>,
    upcoming: RwLock<Vec<UpcomingContest>>,
}

impl InMemoryResultsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed contest. A contest with the same id is replaced and
    /// leaves the schedule of upcoming contests.
    pub fn add_contest(&self, contest: Contest) -> Result<()> {
        let contest_id = contest.contest_id().to_string();
        self.completed
            .write()
            .map_err(|_| EngineError::StorageError {
                message: "Failed to acquire results write lock".to_string(),
            })?
            .insert(contest_id.clone(), contest);

        self.upcoming
            .write()
            .map_err(|_| EngineError::StorageError {
                message: "Failed to acquire schedule write lock".to_string(),
            })?
            .retain(|upcoming| upcoming.contest_id != contest_id);
        Ok(())
    }

    pub fn add_upcoming(&self, contest: UpcomingContest) -> Result<()> {
        let mut upcoming = self.upcoming.write().map_err(|_| EngineError::StorageError {
            message: "Failed to acquire schedule write lock".to_string(),
        })?;
        upcoming.retain(|existing| existing.contest_id != contest.contest_id);
        upcoming.push(contest);
        upcoming.sort_by(|a, b| {
            a.scheduled_for
                .cmp(&b.scheduled_for)
                .then_with(|| a.contest_id.cmp(&b.contest_id))
        });
        Ok(())
    }
}

#[async_trait]
impl ResultsStore for InMemoryResultsStore {
    async fn contest(&self, contest_id: &str) -> Result<Option<Contest>> {
        let completed = self.completed.read().map_err(|_| EngineError::StorageError {
            message: "Failed to acquire results read lock".to_string(),
        })?;
        Ok(completed.get(contest_id).cloned())
    }

    async fn completed_contests(&self) -> Result<Vec<Contest>> {
        let completed = self.completed.read().map_err(|_| EngineError::StorageError {
            message: "Failed to acquire results read lock".to_string(),
        })?;
        let contests: Vec<Contest> = completed.values().cloned().collect();
        Ok(chronological(&contests).into_iter().cloned().collect())
    }

    async fn upcoming_contests(&self) -> Result<Vec<UpcomingContest>> {
        let upcoming = self.upcoming.read().map_err(|_| EngineError::StorageError {
            message: "Failed to acquire schedule read lock".to_string(),
        })?;
        Ok(upcoming.clone())
    }
}
