//! Shared nutrition data structures
//!
//! Used across detected foods, catalog lookups, meal totals, and evaluation.

use serde::{Deserialize, Serialize};

/// Nutritional information for a serving
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionProfile {
    pub calories: f64, // kcal
    pub protein: f64,  // grams
    pub carbs: f64,    // grams
    pub fat: f64,      // grams
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fiber: Option<f64>, // grams
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sugar: Option<f64>, // grams
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sodium: Option<f64>, // milligrams
}

impl NutritionProfile {
    /// Create a new NutritionProfile with all zeros and no optional fields
    pub fn zero() -> Self {
        Self::default()
    }

    /// Scale nutrition values by a multiplier. Absent fields stay absent.
    pub fn scale(&self, multiplier: f64) -> Self {
        Self {
            calories: self.calories * multiplier,
            protein: self.protein * multiplier,
            carbs: self.carbs * multiplier,
            fat: self.fat * multiplier,
            fiber: self.fiber.map(|v| v * multiplier),
            sugar: self.sugar.map(|v| v * multiplier),
            sodium: self.sodium.map(|v| v * multiplier),
        }
    }

    /// Add another profile to this one. Absent optional fields count as zero.
    pub fn add(&self, other: &NutritionProfile) -> Self {
        Self {
            calories: self.calories + other.calories,
            protein: self.protein + other.protein,
            carbs: self.carbs + other.carbs,
            fat: self.fat + other.fat,
            fiber: Some(self.fiber.unwrap_or(0.0) + other.fiber.unwrap_or(0.0)),
            sugar: Some(self.sugar.unwrap_or(0.0) + other.sugar.unwrap_or(0.0)),
            sodium: Some(self.sodium.unwrap_or(0.0) + other.sodium.unwrap_or(0.0)),
        }
    }

    /// Macro totals used for accuracy scoring
    pub fn totals(&self) -> NutrientTotals {
        NutrientTotals {
            calories: self.calories,
            protein: self.protein,
            carbs: self.carbs,
            fat: self.fat,
        }
    }
}

impl std::ops::Add for NutritionProfile {
    type Output = NutritionProfile;

    fn add(self, other: NutritionProfile) -> NutritionProfile {
        NutritionProfile::add(&self, &other)
    }
}

impl std::ops::Mul<f64> for NutritionProfile {
    type Output = NutritionProfile;

    fn mul(self, multiplier: f64) -> NutritionProfile {
        self.scale(multiplier)
    }
}

impl std::iter::Sum for NutritionProfile {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(NutritionProfile::zero(), |acc, n| acc + n)
    }
}

/// Reference nutrition per 100 grams of a cataloged food
///
/// Kept distinct from per-serving profiles so the two are never mixed
/// without going through `calculate_nutrition_for_serving`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Per100g(pub NutritionProfile);

impl Per100g {
    pub fn new(profile: NutritionProfile) -> Self {
        Self(profile)
    }

    pub fn profile(&self) -> &NutritionProfile {
        &self.0
    }
}

/// Summed macro totals for a meal (AI side) or a ground-truth record
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutrientTotals {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl NutrientTotals {
    pub fn is_finite(&self) -> bool {
        [self.calories, self.protein, self.carbs, self.fat]
            .iter()
            .all(|v| v.is_finite())
    }
}

impl From<NutritionProfile> for NutrientTotals {
    fn from(profile: NutritionProfile) -> Self {
        profile.totals()
    }
}
