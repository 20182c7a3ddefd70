//! Nutrition calculation functions
//!
//! Scales per-100g reference profiles to actual servings and sums them across
//! foods and meals.

use serde::{Deserialize, Serialize};

use crate::models::{NutritionProfile, Per100g};

/// Energy per gram of protein (Atwater)
pub const KCAL_PER_G_PROTEIN: f64 = 4.0;
/// Energy per gram of carbohydrate (Atwater)
pub const KCAL_PER_G_CARBS: f64 = 4.0;
/// Energy per gram of fat (Atwater)
pub const KCAL_PER_G_FAT: f64 = 9.0;

/// One food in a meal: its reference profile and the grams eaten
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ServingEntry {
    pub profile: Per100g,
    pub grams: f64,
}

impl ServingEntry {
    pub fn new(profile: Per100g, grams: f64) -> Self {
        Self { profile, grams }
    }
}

/// Share of calories contributed by each macronutrient, in whole percent
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroPercentages {
    pub protein_percent: f64,
    pub carbs_percent: f64,
    pub fat_percent: f64,
}

/// Round to one decimal place, half away from zero
fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Round a summed profile: calories and sodium to integers, grams to one decimal
fn round_totals(total: NutritionProfile) -> NutritionProfile {
    NutritionProfile {
        calories: total.calories.round(),
        protein: round1(total.protein),
        carbs: round1(total.carbs),
        fat: round1(total.fat),
        fiber: total.fiber.map(round1),
        sugar: total.sugar.map(round1),
        sodium: total.sodium.map(f64::round),
    }
}

/// A summed profile always reports every optional field, even for empty input
fn with_zero_optionals(total: NutritionProfile) -> NutritionProfile {
    NutritionProfile {
        fiber: Some(total.fiber.unwrap_or(0.0)),
        sugar: Some(total.sugar.unwrap_or(0.0)),
        sodium: Some(total.sodium.unwrap_or(0.0)),
        ..total
    }
}

/// Scale a per-100g profile to a serving of the given weight
pub fn calculate_nutrition_for_serving(profile: &Per100g, grams: f64) -> NutritionProfile {
    profile.profile().scale(grams / 100.0)
}

/// Total nutrition across several foods, rounded for display
pub fn calculate_total_nutrition(entries: &[ServingEntry]) -> NutritionProfile {
    let total: NutritionProfile = entries
        .iter()
        .map(|e| calculate_nutrition_for_serving(&e.profile, e.grams))
        .sum();

    round_totals(with_zero_optionals(total))
}

/// Total nutrition across already computed meal totals
pub fn calculate_daily_totals(meals: &[NutritionProfile]) -> NutritionProfile {
    let total: NutritionProfile = meals.iter().copied().sum();

    round_totals(with_zero_optionals(total))
}

/// Calorie share of protein, carbs and fat
///
/// Each share is rounded independently, so the three need not add up to 100.
pub fn calculate_macro_percentages(profile: &NutritionProfile) -> MacroPercentages {
    let total_calories = if profile.calories == 0.0 {
        1.0
    } else {
        profile.calories
    };

    let percent = |grams: f64, kcal_per_gram: f64| {
        (grams * kcal_per_gram / total_calories * 100.0).round()
    };

    MacroPercentages {
        protein_percent: percent(profile.protein, KCAL_PER_G_PROTEIN),
        carbs_percent: percent(profile.carbs, KCAL_PER_G_CARBS),
        fat_percent: percent(profile.fat, KCAL_PER_G_FAT),
    }
}
