//! Common types used throughout the rating engine

use crate::error::EngineError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Identifier for drivers and teams
pub type EntityId = String;

/// Identifier for contests (races)
pub type ContestId = String;

/// Rating assigned to an entity the first time it appears
pub const BASE_RATING: i32 = 1500;

/// Minimum permissible rating value
pub const RATING_FLOOR: i32 = 500;

/// Kind of rated entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Driver,
    Team,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Driver => write!(f, "driver"),
            EntityKind::Team => write!(f, "team"),
        }
    }
}

/// Recorded outcome status of a contest entry, as supplied by the results store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Finished,
    Retired,
    Dnf,
    Disqualified,
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutcomeStatus::Finished => write!(f, "finished"),
            OutcomeStatus::Retired => write!(f, "retired"),
            OutcomeStatus::Dnf => write!(f, "dnf"),
            OutcomeStatus::Disqualified => write!(f, "disqualified"),
        }
    }
}

/// Validated outcome of one entry. Only classified entries carry a rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placement {
    Classified { rank: u32 },
    Retired,
    Dnf,
    Disqualified,
}

impl Placement {
    /// Final rank, if the entry was classified
    pub fn rank(&self) -> Option<u32> {
        match self {
            Placement::Classified { rank } => Some(*rank),
            _ => None,
        }
    }

    pub fn status(&self) -> OutcomeStatus {
        match self {
            Placement::Classified { .. } => OutcomeStatus::Finished,
            Placement::Retired => OutcomeStatus::Retired,
            Placement::Dnf => OutcomeStatus::Dnf,
            Placement::Disqualified => OutcomeStatus::Disqualified,
        }
    }

    pub fn is_classified(&self) -> bool {
        matches!(self, Placement::Classified { .. })
    }
}

/// Entry shape as it arrives from the results store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawContestEntry {
    pub entity_id: EntityId,
    #[serde(default)]
    pub team_id: Option<EntityId>,
    #[serde(default)]
    pub final_rank: Option<u32>,
    pub outcome_status: OutcomeStatus,
}

/// One entrant's recorded result in a contest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContestEntry {
    pub entity_id: EntityId,
    pub team_id: Option<EntityId>,
    pub placement: Placement,
}

impl ContestEntry {
    pub fn new(entity_id: impl Into<EntityId>, placement: Placement) -> Self {
        Self {
            entity_id: entity_id.into(),
            team_id: None,
            placement,
        }
    }

    /// Classified entry finishing at `rank`
    pub fn finished(entity_id: impl Into<EntityId>, rank: u32) -> Self {
        Self::new(entity_id, Placement::Classified { rank })
    }

    pub fn with_team(mut self, team_id: impl Into<EntityId>) -> Self {
        self.team_id = Some(team_id.into());
        self
    }

    /// Validate a raw entry. A rank must be present exactly when the entry finished.
    pub fn from_raw(contest_id: &str, raw: RawContestEntry) -> Result<Self, EngineError> {
        let invalid = |reason: &str| EngineError::InvalidContestEntry {
            contest_id: contest_id.to_string(),
            entity_id: raw.entity_id.clone(),
            reason: reason.to_string(),
        };

        if raw.entity_id.trim().is_empty() {
            return Err(invalid("entity id is empty"));
        }

        let placement = match (raw.outcome_status, raw.final_rank) {
            (OutcomeStatus::Finished, Some(rank)) => Placement::Classified { rank },
            (OutcomeStatus::Finished, None) => {
                return Err(invalid("finished entry has no final rank"));
            }
            (status, Some(_)) => {
                return Err(invalid(&format!("{} entry must not carry a final rank", status)));
            }
            (OutcomeStatus::Retired, None) => Placement::Retired,
            (OutcomeStatus::Dnf, None) => Placement::Dnf,
            (OutcomeStatus::Disqualified, None) => Placement::Disqualified,
        };

        Ok(Self {
            entity_id: raw.entity_id,
            team_id: raw.team_id.filter(|team| !team.trim().is_empty()),
            placement,
        })
    }
}

impl From<ContestEntry> for RawContestEntry {
    fn from(entry: ContestEntry) -> Self {
        Self {
            entity_id: entry.entity_id,
            team_id: entry.team_id,
            final_rank: entry.placement.rank(),
            outcome_status: entry.placement.status(),
        }
    }
}

/// Contest shape as it arrives from the results store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawContest {
    pub contest_id: ContestId,
    pub occurred_at: NaiveDate,
    pub entries: Vec<RawContestEntry>,
    #[serde(default)]
    pub field_size: Option<usize>,
}

/// A completed contest with a validated, rank-ordered result set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawContest", into = "RawContest")]
pub struct Contest {
    contest_id: ContestId,
    occurred_at: NaiveDate,
    entries: Vec<ContestEntry>,
    field_size: usize,
}

impl Contest {
    /// Build a contest, rejecting duplicate entrants and out-of-range or shared ranks.
    ///
    /// Entries are reordered so classified entrants come first by rank, followed
    /// by unclassified entrants in their original order.
    pub fn new(
        contest_id: impl Into<ContestId>,
        occurred_at: NaiveDate,
        mut entries: Vec<ContestEntry>,
    ) -> Result<Self, EngineError> {
        let contest_id = contest_id.into();
        if contest_id.trim().is_empty() {
            return Err(EngineError::InvalidContest {
                contest_id,
                reason: "contest id is empty".to_string(),
            });
        }

        let field_size = entries.len();
        let mut seen_entities = HashSet::new();
        let mut seen_ranks = HashSet::new();

        for entry in &entries {
            let invalid = |reason: String| EngineError::InvalidContestEntry {
                contest_id: contest_id.clone(),
                entity_id: entry.entity_id.clone(),
                reason,
            };

            if !seen_entities.insert(entry.entity_id.as_str()) {
                return Err(invalid("entity appears more than once".to_string()));
            }

            if let Some(rank) = entry.placement.rank() {
                if rank == 0 || rank as usize > field_size {
                    return Err(invalid(format!(
                        "rank {} outside field of {}",
                        rank, field_size
                    )));
                }
                if !seen_ranks.insert(rank) {
                    return Err(invalid(format!("rank {} is shared", rank)));
                }
            }
        }

        entries.sort_by_key(|entry| entry.placement.rank().unwrap_or(u32::MAX));

        Ok(Self {
            contest_id,
            occurred_at,
            entries,
            field_size,
        })
    }

    pub fn contest_id(&self) -> &str {
        &self.contest_id
    }

    pub fn occurred_at(&self) -> NaiveDate {
        self.occurred_at
    }

    pub fn entries(&self) -> &[ContestEntry] {
        &self.entries
    }

    pub fn field_size(&self) -> usize {
        self.field_size
    }

    /// Entrants that finished, in rank order
    pub fn classified(&self) -> impl Iterator<Item = &ContestEntry> {
        self.entries.iter().filter(|e| e.placement.is_classified())
    }

    /// The rank-1 finisher, if any entrant was classified first
    pub fn winner(&self) -> Option<&ContestEntry> {
        self.entries
            .iter()
            .find(|e| e.placement.rank() == Some(1))
    }
}

impl TryFrom<RawContest> for Contest {
    type Error = EngineError;

    fn try_from(raw: RawContest) -> Result<Self, Self::Error> {
        if let Some(declared) = raw.field_size {
            if declared != raw.entries.len() {
                return Err(EngineError::InvalidContest {
                    contest_id: raw.contest_id,
                    reason: format!(
                        "declared field size {} does not match {} entries",
                        declared,
                        raw.entries.len()
                    ),
                });
            }
        }

        let entries = raw
            .entries
            .into_iter()
            .map(|entry| ContestEntry::from_raw(&raw.contest_id, entry))
            .collect::<Result<Vec<_>, _>>()?;

        Contest::new(raw.contest_id, raw.occurred_at, entries)
    }
}

impl From<Contest> for RawContest {
    fn from(contest: Contest) -> Self {
        Self {
            contest_id: contest.contest_id,
            occurred_at: contest.occurred_at,
            field_size: Some(contest.field_size),
            entries: contest.entries.into_iter().map(Into::into).collect(),
        }
    }
}

/// A contest that has not run yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpcomingContest {
    pub contest_id: ContestId,
    pub scheduled_for: NaiveDate,
    /// Confirmed entrants. `None` means every rated driver.
    #[serde(default)]
    pub roster: Option<Vec<EntityId>>,
}

/// Current rating of one entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub entity_id: EntityId,
    pub kind: EntityKind,
    pub value: i32,
}

/// Audit record of one entity's rating change in one contest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingDelta {
    pub entity_id: EntityId,
    pub kind: EntityKind,
    pub contest_id: ContestId,
    pub old_rating: i32,
    pub new_rating: i32,
    pub change: i32,
    pub actual_rank: Option<u32>,
    pub expected_rank: f64,
}

/// Rating lifecycle of a single entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    Unrated,
    Rated(i32),
}

/// Point-in-time view of every known rating
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingSnapshot {
    #[serde(default)]
    pub drivers: BTreeMap<EntityId, i32>,
    #[serde(default)]
    pub teams: BTreeMap<EntityId, i32>,
}

impl RatingSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of(&self, kind: EntityKind) -> &BTreeMap<EntityId, i32> {
        match kind {
            EntityKind::Driver => &self.drivers,
            EntityKind::Team => &self.teams,
        }
    }

    fn of_mut(&mut self, kind: EntityKind) -> &mut BTreeMap<EntityId, i32> {
        match kind {
            EntityKind::Driver => &mut self.drivers,
            EntityKind::Team => &mut self.teams,
        }
    }

    pub fn get(&self, kind: EntityKind, entity_id: &str) -> Option<i32> {
        self.of(kind).get(entity_id).copied()
    }

    /// Rating of the entity, or `default` when it has never been rated
    pub fn rating_or(&self, kind: EntityKind, entity_id: &str, default: i32) -> i32 {
        self.get(kind, entity_id).unwrap_or(default)
    }

    pub fn set(&mut self, kind: EntityKind, entity_id: impl Into<EntityId>, value: i32) {
        self.of_mut(kind).insert(entity_id.into(), value);
    }

    pub fn state(&self, kind: EntityKind, entity_id: &str) -> EntityState {
        match self.get(kind, entity_id) {
            Some(value) => EntityState::Rated(value),
            None => EntityState::Unrated,
        }
    }

    /// Write every delta's new rating into the snapshot
    pub fn apply(&mut self, update: &ContestUpdate) {
        for delta in update.deltas() {
            self.set(delta.kind, delta.entity_id.clone(), delta.new_rating);
        }
    }

    pub fn len(&self) -> usize {
        self.drivers.len() + self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty() && self.teams.is_empty()
    }

    /// Ratings of one kind, highest first, ties broken by id
    pub fn ranked(&self, kind: EntityKind) -> Vec<Rating> {
        let mut ratings: Vec<Rating> = self
            .of(kind)
            .iter()
            .map(|(entity_id, value)| Rating {
                entity_id: entity_id.clone(),
                kind,
                value: *value,
            })
            .collect();
        ratings.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.entity_id.cmp(&b.entity_id)));
        ratings
    }
}

/// Every rating change produced by one contest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContestUpdate {
    pub contest_id: ContestId,
    pub drivers: BTreeMap<EntityId, RatingDelta>,
    pub teams: BTreeMap<EntityId, RatingDelta>,
}

impl ContestUpdate {
    pub fn empty(contest_id: impl Into<ContestId>) -> Self {
        Self {
            contest_id: contest_id.into(),
            ..Self::default()
        }
    }

    pub fn get(&self, kind: EntityKind, entity_id: &str) -> Option<&RatingDelta> {
        match kind {
            EntityKind::Driver => self.drivers.get(entity_id),
            EntityKind::Team => self.teams.get(entity_id),
        }
    }

    /// Driver deltas followed by team deltas, each ordered by id
    pub fn deltas(&self) -> impl Iterator<Item = &RatingDelta> {
        self.drivers.values().chain(self.teams.values())
    }

    pub fn len(&self) -> usize {
        self.drivers.len() + self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty() && self.teams.is_empty()
    }
}

/// Win probability issued for one entrant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionEntry {
    pub entity_id: EntityId,
    pub rating: i32,
    /// Percentage in `[0, 100]`
    pub win_probability: f64,
}

/// Win probabilities issued for an upcoming contest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionSet {
    pub contest_id: ContestId,
    pub model_version: String,
    pub entries: Vec<PredictionEntry>,
}

impl PredictionSet {
    pub fn probability(&self, entity_id: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.entity_id == entity_id)
            .map(|e| e.win_probability)
    }

    pub fn total_probability(&self) -> f64 {
        self.entries.iter().map(|e| e.win_probability).sum()
    }

    /// The `n` most likely winners, highest probability first, ties broken by id
    pub fn favourites(&self, n: usize) -> Vec<&PredictionEntry> {
        let mut ranked: Vec<&PredictionEntry> = self.entries.iter().collect();
        ranked.sort_by(|a, b| {
            b.win_probability
                .partial_cmp(&a.win_probability)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.entity_id.cmp(&b.entity_id))
        });
        ranked.truncate(n);
        ranked
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Score of one prediction set against the recorded result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyRecord {
    pub contest_id: ContestId,
    pub model_version: String,
    pub brier_score: f64,
    pub log_loss: f64,
    pub correct_winner: bool,
    pub top_3_accuracy: bool,
}
