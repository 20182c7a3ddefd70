//! Detected food model
//!
//! A food reported by the vision model, with its serving converted to grams.

use serde::{Deserialize, Serialize};

use super::{NutritionProfile, Per100g};
use crate::nutrition::{
    calculate_nutrition_for_serving, convert_to_grams_detailed, estimate_grams_from_description,
    ConversionSource,
};

/// A quantity and unit with the gram weight derived from them
///
/// The gram weight is computed once at construction and never changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServingDescriptor {
    quantity: f64,
    unit: String,
    gram_weight: f64,
    conversion: ConversionSource,
}

impl ServingDescriptor {
    /// Build a descriptor from an explicit unit via the unit table
    pub fn new(quantity: f64, unit: impl Into<String>) -> Self {
        let unit = unit.into();
        let conv = convert_to_grams_detailed(quantity, &unit);
        Self {
            quantity,
            unit,
            gram_weight: conv.grams,
            conversion: conv.source,
        }
    }

    /// Build a descriptor when no unit is known, guessing from the description
    pub fn from_description(description: &str, quantity: f64) -> Self {
        Self {
            quantity,
            unit: String::new(),
            gram_weight: estimate_grams_from_description(description, quantity),
            conversion: ConversionSource::Description,
        }
    }

    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn gram_weight(&self) -> f64 {
        self.gram_weight
    }

    pub fn conversion(&self) -> ConversionSource {
        self.conversion
    }

    /// True when the gram weight came from a fallback guess
    pub fn is_estimated(&self) -> bool {
        self.conversion.is_estimate()
    }
}

/// Raw detection as supplied by the vision collaborator
#[derive(Debug, Clone, Deserialize)]
pub struct DetectedFoodInput {
    pub name: String,
    pub quantity: f64,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub nutrition: Option<Per100g>,
}

fn default_confidence() -> f64 {
    1.0
}

/// A food identified in a meal image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "DetectedFoodInput")]
pub struct DetectedFood {
    pub name: String,
    #[serde(flatten)]
    pub serving: ServingDescriptor,
    pub confidence: f64,
    /// Catalog profile once the food has been resolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nutrition: Option<Per100g>,
}

impl DetectedFood {
    pub fn new(
        name: impl Into<String>,
        quantity: f64,
        unit: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            name: name.into(),
            serving: ServingDescriptor::new(quantity, unit),
            confidence,
            nutrition: None,
        }
    }

    /// Attach a resolved per-100g profile
    pub fn with_nutrition(mut self, profile: Per100g) -> Self {
        self.nutrition = Some(profile);
        self
    }

    pub fn grams(&self) -> f64 {
        self.serving.gram_weight()
    }

    /// Nutrition for the detected serving, if the food has been resolved
    pub fn serving_nutrition(&self) -> Option<NutritionProfile> {
        self.nutrition
            .as_ref()
            .map(|p| calculate_nutrition_for_serving(p, self.grams()))
    }
}

impl From<DetectedFoodInput> for DetectedFood {
    fn from(input: DetectedFoodInput) -> Self {
        let serving = match input.unit.as_deref().map(str::trim) {
            Some(unit) if !unit.is_empty() => ServingDescriptor::new(input.quantity, unit),
            _ => ServingDescriptor::from_description(&input.name, input.quantity),
        };

        Self {
            name: input.name,
            serving,
            confidence: input.confidence,
            nutrition: input.nutrition,
        }
    }
}
