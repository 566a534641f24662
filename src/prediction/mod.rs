//! Win-probability prediction and accuracy scoring

pub mod accuracy;
pub mod predictor;
pub mod storage;

pub use accuracy::{evaluate, AccuracySummary};
pub use predictor::{win_probabilities, Predictor};
pub use storage::{InMemoryPredictionStore, PredictionStore};
