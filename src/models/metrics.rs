//! Evaluation metric records
//!
//! Scores for one detection result, or the mean over a run.

use serde::{Deserialize, Serialize};

/// Weight of the F1 score in the overall score
pub const F1_WEIGHT: f64 = 0.4;
/// Weight of quantity accuracy in the overall score
pub const QUANTITY_WEIGHT: f64 = 0.3;
/// Weight of calorie accuracy in the overall score
pub const CALORIE_WEIGHT: f64 = 0.3;

/// Weighted composite of identification, quantity and calorie accuracy
pub fn overall_score(f1_score: f64, quantity_accuracy: f64, calorie_accuracy: f64) -> f64 {
    F1_WEIGHT * f1_score + QUANTITY_WEIGHT * quantity_accuracy + CALORIE_WEIGHT * calorie_accuracy
}

/// Per-nutrient accuracy of AI totals against ground truth totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionAccuracy {
    pub calorie_accuracy: f64,
    pub protein_accuracy: f64,
    pub carbs_accuracy: f64,
    pub fat_accuracy: f64,
}

/// Scores for a detection result
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub food_detection_accuracy: f64,
    pub quantity_accuracy: f64,
    pub avg_quantity_error: f64,
    pub calorie_accuracy: f64,
    pub protein_accuracy: f64,
    pub carbs_accuracy: f64,
    pub fat_accuracy: f64,
    pub overall_score: f64,
}

impl EvaluationMetrics {
    /// All-zero record used when an item could not be evaluated
    pub fn zeroed() -> Self {
        Self::default()
    }

    /// Attach nutrition accuracy and recompute the overall score from it
    pub fn with_nutrition_accuracy(self, accuracy: NutritionAccuracy) -> Self {
        Self {
            calorie_accuracy: accuracy.calorie_accuracy,
            protein_accuracy: accuracy.protein_accuracy,
            carbs_accuracy: accuracy.carbs_accuracy,
            fat_accuracy: accuracy.fat_accuracy,
            overall_score: overall_score(
                self.f1_score,
                self.quantity_accuracy,
                accuracy.calorie_accuracy,
            ),
            ..self
        }
    }

    /// Whether every score can be stored and read back as JSON
    pub fn is_finite(&self) -> bool {
        [
            self.precision,
            self.recall,
            self.f1_score,
            self.food_detection_accuracy,
            self.quantity_accuracy,
            self.avg_quantity_error,
            self.calorie_accuracy,
            self.protein_accuracy,
            self.carbs_accuracy,
            self.fat_accuracy,
            self.overall_score,
        ]
        .iter()
        .all(|v| v.is_finite())
    }

    pub fn nutrition_accuracy(&self) -> NutritionAccuracy {
        NutritionAccuracy {
            calorie_accuracy: self.calorie_accuracy,
            protein_accuracy: self.protein_accuracy,
            carbs_accuracy: self.carbs_accuracy,
            fat_accuracy: self.fat_accuracy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_sum_to_one() {
        assert!((F1_WEIGHT + QUANTITY_WEIGHT + CALORIE_WEIGHT - 1.0).abs() < 1e-12);
        assert!((overall_score(1.0, 1.0, 1.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_with_nutrition_accuracy_recomputes_overall() {
        let base = EvaluationMetrics {
            f1_score: 0.8,
            quantity_accuracy: 0.5,
            overall_score: 0.47,
            ..Default::default()
        };
        let accuracy = NutritionAccuracy {
            calorie_accuracy: 0.75,
            protein_accuracy: 0.6,
            carbs_accuracy: 0.9,
            fat_accuracy: 0.4,
        };
        let m = base.with_nutrition_accuracy(accuracy);
        assert_eq!(m.overall_score, 0.4 * 0.8 + 0.3 * 0.5 + 0.3 * 0.75);
        assert_eq!(m.nutrition_accuracy(), accuracy);

        // Applying twice gives the same record
        assert_eq!(m.with_nutrition_accuracy(accuracy), m);
    }
}
