//! Data models
//!
//! Rust structs for foods, ground truth, metrics and their database records.

mod benchmark;
mod evaluation_run;
mod food;
mod food_cache;
mod ground_truth;
mod metrics;
mod nutrition;

pub use benchmark::{BenchmarkItem, BenchmarkItemCreate};
pub use evaluation_run::{
    EvaluationResult, EvaluationResultCreate, EvaluationRun, EvaluationRunCreate,
};
pub use food::{DetectedFood, DetectedFoodInput, ServingDescriptor};
pub use food_cache::CachedFood;
pub use ground_truth::{GroundTruth, GroundTruthError, GroundTruthFood, TOTALS_TOLERANCE};
pub use metrics::{
    overall_score, EvaluationMetrics, NutritionAccuracy, CALORIE_WEIGHT, F1_WEIGHT,
    QUANTITY_WEIGHT,
};
pub use nutrition::{NutrientTotals, NutritionProfile, Per100g};
