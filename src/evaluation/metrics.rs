//! Detection scoring
//!
//! Scores one detection result against its ground truth and averages scores
//! across a run. Every function here is pure and never fails; degenerate input
//! produces zero (or maximum-error) metrics.

use super::matching::{match_foods, normalize_name, normalized_names_match, MatchCounts};
use crate::models::{
    overall_score, DetectedFood, EvaluationMetrics, GroundTruth, NutrientTotals,
    NutritionAccuracy,
};
use crate::nutrition::convert_to_grams;

/// Relative error assumed when no quantity could be compared
pub const MAX_QUANTITY_ERROR: f64 = 1.0;

/// Precision, recall and F1 from match counts
fn detection_scores(counts: &MatchCounts) -> (f64, f64, f64) {
    let tp = counts.true_positives as f64;

    let precision = if counts.true_positives > 0 {
        tp / (tp + counts.false_positives as f64)
    } else {
        0.0
    };
    let recall = if counts.true_positives > 0 {
        tp / (tp + counts.false_negatives as f64)
    } else {
        0.0
    };
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    (precision, recall, f1)
}

/// Mean that stays finite when every value is finite
fn finite_mean(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    values.iter().map(|v| v / n).sum()
}

/// Mean relative gram error between detections and their matching labels
///
/// Each detection is compared with the first matching label, whether or not
/// that label was already claimed during precision/recall matching.
fn average_quantity_error(
    detected: &[DetectedFood],
    detected_names: &[String],
    ground_truth: &GroundTruth,
    actual_names: &[String],
) -> f64 {
    let errors: Vec<f64> = detected
        .iter()
        .zip(detected_names)
        .filter_map(|(food, name)| {
            let idx = actual_names
                .iter()
                .position(|a| normalized_names_match(name, a))?;
            let label = &ground_truth.foods[idx];
            let gt_grams = convert_to_grams(label.quantity, &label.unit);
            if gt_grams <= 0.0 {
                return None;
            }
            Some(((food.grams() - gt_grams).abs() / gt_grams).min(f64::MAX))
        })
        .collect();

    if errors.is_empty() {
        MAX_QUANTITY_ERROR
    } else {
        finite_mean(&errors)
    }
}

/// Score detected foods against ground truth
///
/// Nutrition accuracy fields are left at zero; attach them with
/// `EvaluationMetrics::with_nutrition_accuracy` once AI totals are known.
pub fn calculate_metrics(
    detected: &[DetectedFood],
    ground_truth: &GroundTruth,
) -> EvaluationMetrics {
    let detected_names: Vec<String> = detected.iter().map(|f| normalize_name(&f.name)).collect();
    let actual_names: Vec<String> = ground_truth
        .foods
        .iter()
        .map(|f| normalize_name(&f.name))
        .collect();

    let counts = match_foods(&detected_names[..], &actual_names[..]);
    let (precision, recall, f1_score) = detection_scores(&counts);

    let food_detection_accuracy = if actual_names.is_empty() {
        0.0
    } else {
        counts.true_positives as f64 / actual_names.len() as f64
    };

    let avg_quantity_error =
        average_quantity_error(detected, &detected_names, ground_truth, &actual_names);
    let quantity_accuracy = (1.0 - avg_quantity_error).max(0.0);

    tracing::debug!(
        "Matched {} of {} detections against {} labels",
        counts.true_positives,
        detected_names.len(),
        actual_names.len()
    );

    EvaluationMetrics {
        precision,
        recall,
        f1_score,
        food_detection_accuracy,
        quantity_accuracy,
        avg_quantity_error,
        calorie_accuracy: 0.0,
        protein_accuracy: 0.0,
        carbs_accuracy: 0.0,
        fat_accuracy: 0.0,
        overall_score: overall_score(f1_score, quantity_accuracy, 0.0),
    }
}

/// Accuracy of one nutrient total; a zero reference counts as no error
fn nutrient_accuracy(ai: f64, gt: f64) -> f64 {
    let error = if gt == 0.0 { 0.0 } else { (ai - gt).abs() / gt };
    (1.0 - error).max(0.0)
}

/// Compare summed AI nutrition against the ground truth's stored totals
pub fn calculate_nutrition_accuracy(
    ai_totals: &NutrientTotals,
    ground_truth: &GroundTruth,
) -> NutritionAccuracy {
    let gt = ground_truth.totals();

    NutritionAccuracy {
        calorie_accuracy: nutrient_accuracy(ai_totals.calories, gt.calories),
        protein_accuracy: nutrient_accuracy(ai_totals.protein, gt.protein),
        carbs_accuracy: nutrient_accuracy(ai_totals.carbs, gt.carbs),
        fat_accuracy: nutrient_accuracy(ai_totals.fat, gt.fat),
    }
}

/// Full score for one item: detection, quantity and nutrition
pub fn score_detection(
    detected: &[DetectedFood],
    ai_totals: &NutrientTotals,
    ground_truth: &GroundTruth,
) -> EvaluationMetrics {
    calculate_metrics(detected, ground_truth)
        .with_nutrition_accuracy(calculate_nutrition_accuracy(ai_totals, ground_truth))
}

/// Field-wise arithmetic mean of a batch of metrics
pub fn aggregate_metrics(metrics: &[EvaluationMetrics]) -> EvaluationMetrics {
    if metrics.is_empty() {
        return EvaluationMetrics::zeroed();
    }

    let n = metrics.len() as f64;
    let mean = |field: fn(&EvaluationMetrics) -> f64| {
        metrics.iter().map(|m| field(m) / n).sum::<f64>()
    };

    EvaluationMetrics {
        precision: mean(|m| m.precision),
        recall: mean(|m| m.recall),
        f1_score: mean(|m| m.f1_score),
        food_detection_accuracy: mean(|m| m.food_detection_accuracy),
        quantity_accuracy: mean(|m| m.quantity_accuracy),
        avg_quantity_error: mean(|m| m.avg_quantity_error),
        calorie_accuracy: mean(|m| m.calorie_accuracy),
        protein_accuracy: mean(|m| m.protein_accuracy),
        carbs_accuracy: mean(|m| m.carbs_accuracy),
        fat_accuracy: mean(|m| m.fat_accuracy),
        overall_score: mean(|m| m.overall_score),
    }
}
