//! Elo rating system for multi-entrant contests
//!
//! This module provides the pure rating calculations, the per-contest update
//! engine, history replay, and the storage interface for current ratings.

pub mod calculator;
pub mod engine;
pub mod replay;
pub mod storage;

// Re-export commonly used types
pub use calculator::{
    expected_rank, expected_score, k_factor_for_field, position_score, rating_delta,
};
pub use engine::update_contest;
pub use replay::{apply_incremental, replay_history, ReplayOutcome};
pub use storage::{InMemoryRatingStore, RatingStore};
