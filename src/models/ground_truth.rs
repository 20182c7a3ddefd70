//! Ground truth model
//!
//! Hand-labeled foods for a benchmark image, with already scaled nutrition.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::NutrientTotals;
use crate::nutrition::convert_to_grams;

/// Largest allowed difference between a stored total and the sum of its foods
pub const TOTALS_TOLERANCE: f64 = 1.0;

/// Ground truth validation errors
#[derive(Debug, Error, PartialEq)]
pub enum GroundTruthError {
    #[error("Ground truth has no foods")]
    NoFoods,

    #[error("Food '{food}' has an invalid {field}: {value}")]
    InvalidValue {
        food: String,
        field: &'static str,
        value: f64,
    },

    #[error("Food '{food}' quantity {quantity} {unit} is too large to weigh")]
    QuantityOverflow {
        food: String,
        quantity: f64,
        unit: String,
    },

    #[error("Stored total {nutrient} is {stored} but foods sum to {computed}")]
    TotalsMismatch {
        nutrient: &'static str,
        stored: f64,
        computed: f64,
    },
}

/// One labeled food with its nutrition for the labeled quantity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTruthFood {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

/// Labeled foods for one image plus their stored totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTruth {
    pub foods: Vec<GroundTruthFood>,
    pub total_calories: f64,
    pub total_protein: f64,
    pub total_carbs: f64,
    pub total_fat: f64,
}

impl GroundTruth {
    /// Build a ground truth whose totals are the sum of its foods
    pub fn from_foods(foods: Vec<GroundTruthFood>) -> Self {
        let sum = sum_foods(&foods);
        Self {
            foods,
            total_calories: sum.calories,
            total_protein: sum.protein,
            total_carbs: sum.carbs,
            total_fat: sum.fat,
        }
    }

    /// The stored totals, as used for scoring
    pub fn totals(&self) -> NutrientTotals {
        NutrientTotals {
            calories: self.total_calories,
            protein: self.total_protein,
            carbs: self.total_carbs,
            fat: self.total_fat,
        }
    }

    /// Sum of the per-food values
    pub fn computed_totals(&self) -> NutrientTotals {
        sum_foods(&self.foods)
    }

    /// Check the record before it is stored
    ///
    /// Scoring trusts the stored totals, so they must agree with the foods.
    pub fn check_totals(&self) -> Result<(), GroundTruthError> {
        if self.foods.is_empty() {
            return Err(GroundTruthError::NoFoods);
        }

        for food in &self.foods {
            let fields = [
                ("quantity", food.quantity),
                ("calories", food.calories),
                ("protein", food.protein),
                ("carbs", food.carbs),
                ("fat", food.fat),
            ];
            for (field, value) in fields {
                if !value.is_finite() || value < 0.0 {
                    return Err(GroundTruthError::InvalidValue {
                        food: food.name.clone(),
                        field,
                        value,
                    });
                }
            }
            // Positive quantities only convert to 0g when the weight overflows
            if food.quantity > 0.0 && convert_to_grams(food.quantity, &food.unit) == 0.0 {
                return Err(GroundTruthError::QuantityOverflow {
                    food: food.name.clone(),
                    quantity: food.quantity,
                    unit: food.unit.clone(),
                });
            }
        }

        let stored = self.totals();
        let computed = self.computed_totals();
        let pairs = [
            ("calories", stored.calories, computed.calories),
            ("protein", stored.protein, computed.protein),
            ("carbs", stored.carbs, computed.carbs),
            ("fat", stored.fat, computed.fat),
        ];
        for (nutrient, stored, computed) in pairs {
            if !stored.is_finite() || (stored - computed).abs() > TOTALS_TOLERANCE {
                return Err(GroundTruthError::TotalsMismatch {
                    nutrient,
                    stored,
                    computed,
                });
            }
        }

        Ok(())
    }
}

fn sum_foods(foods: &[GroundTruthFood]) -> NutrientTotals {
    foods.iter().fold(NutrientTotals::default(), |acc, f| NutrientTotals {
        calories: acc.calories + f.calories,
        protein: acc.protein + f.protein,
        carbs: acc.carbs + f.carbs,
        fat: acc.fat + f.fat,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn food(name: &str, calories: f64) -> GroundTruthFood {
        GroundTruthFood {
            name: name.to_string(),
            quantity: 1.0,
            unit: "cup".to_string(),
            calories,
            protein: 5.0,
            carbs: 20.0,
            fat: 2.0,
        }
    }

    #[test]
    fn test_from_foods_sums_totals() {
        let gt = GroundTruth::from_foods(vec![food("rice", 200.0), food("beans", 230.0)]);
        assert_eq!(gt.total_calories, 430.0);
        assert_eq!(gt.total_protein, 10.0);
        assert_eq!(gt.check_totals(), Ok(()));
    }

    #[test]
    fn test_mismatched_totals_rejected() {
        let mut gt = GroundTruth::from_foods(vec![food("rice", 200.0)]);
        gt.total_calories = 250.0;
        assert_eq!(
            gt.check_totals(),
            Err(GroundTruthError::TotalsMismatch {
                nutrient: "calories",
                stored: 250.0,
                computed: 200.0,
            })
        );
    }

    #[test]
    fn test_small_rounding_differences_allowed() {
        let mut gt = GroundTruth::from_foods(vec![food("rice", 200.0)]);
        gt.total_fat = 2.5;
        assert!(gt.check_totals().is_ok());
    }

    #[test]
    fn test_empty_ground_truth_rejected() {
        let gt = GroundTruth::from_foods(Vec::new());
        assert_eq!(gt.check_totals(), Err(GroundTruthError::NoFoods));
    }

    #[test]
    fn test_negative_values_rejected() {
        let gt = GroundTruth::from_foods(vec![food("rice", -5.0)]);
        assert!(matches!(
            gt.check_totals(),
            Err(GroundTruthError::InvalidValue { field: "calories", .. })
        ));
    }

    #[test]
    fn test_overflowing_quantity_rejected() {
        let mut huge = food("rice", 200.0);
        huge.quantity = 1e306;
        huge.unit = "kg".to_string();
        let gt = GroundTruth::from_foods(vec![huge]);
        assert!(matches!(
            gt.check_totals(),
            Err(GroundTruthError::QuantityOverflow { .. })
        ));
    }
}
