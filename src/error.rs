//! Error types for the rating engine
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application. Callers that need to tell a data-validation fault
//! apart from a storage fault can `downcast_ref::<EngineError>()`.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific engine scenarios
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid entry for '{entity_id}' in contest {contest_id}: {reason}")]
    InvalidContestEntry {
        contest_id: String,
        entity_id: String,
        reason: String,
    },

    #[error("Invalid contest {contest_id}: {reason}")]
    InvalidContest { contest_id: String, reason: String },

    #[error("Contest not found: {contest_id}")]
    ContestNotFound { contest_id: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Storage error: {message}")]
    StorageError { message: String },
}
