//! Evaluation engine
//!
//! Food matching, per-item scoring and batch runs against benchmark items.

pub mod matching;
pub mod metrics;
pub mod runner;

pub use matching::{match_foods, names_match, normalize_name, normalized_names_match, MatchCounts};
pub use metrics::{
    aggregate_metrics, calculate_metrics, calculate_nutrition_accuracy, score_detection,
    MAX_QUANTITY_ERROR,
};
pub use runner::{DetectionOutcome, Evaluator, ItemEvaluation, RunReport, Submission};
