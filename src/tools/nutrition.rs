//! Nutrition MCP Tools
//!
//! Unit conversion, serving math and catalog lookups. None of these touch the
//! database except through the catalog's cache.

use serde::{Deserialize, Serialize};

use crate::catalog::{resolve_or_placeholder, NutritionCatalog, Resolution};
use crate::models::{NutritionProfile, Per100g};
use crate::nutrition::{
    calculate_daily_totals as sum_daily, calculate_macro_percentages,
    calculate_nutrition_for_serving, calculate_total_nutrition, convert_to_grams_detailed,
    estimate_grams_from_description, ConversionSource, MacroPercentages, ServingEntry,
    UnitCategory,
};

/// Response for convert_to_grams
#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub quantity: f64,
    pub unit: String,
    pub grams: f64,
    pub source: ConversionSource,
    pub category: Option<UnitCategory>,
    pub estimated: bool,
}

/// Response for estimate_grams
#[derive(Debug, Serialize)]
pub struct EstimateResponse {
    pub description: String,
    pub quantity: f64,
    pub grams: f64,
}

/// One food in a meal calculation
#[derive(Debug, Clone, Deserialize)]
pub struct MealItemInput {
    pub name: Option<String>,
    pub quantity: f64,
    pub unit: String,
    /// Nutrition per 100g of this food
    pub per_100g: NutritionProfile,
}

/// Per-item breakdown of a meal
#[derive(Debug, Serialize)]
pub struct MealItemNutrition {
    pub name: Option<String>,
    pub grams: f64,
    pub estimated: bool,
    pub nutrition: NutritionProfile,
}

/// Response for calculate_meal_nutrition
#[derive(Debug, Serialize)]
pub struct MealNutritionResponse {
    pub items: Vec<MealItemNutrition>,
    pub total: NutritionProfile,
    pub macro_percentages: MacroPercentages,
}

/// Response for calculate_daily_totals
#[derive(Debug, Serialize)]
pub struct DailyTotalsResponse {
    pub meal_count: usize,
    pub total: NutritionProfile,
    pub macro_percentages: MacroPercentages,
}

/// Response for lookup_food_nutrition
#[derive(Debug, Serialize)]
pub struct LookupResponse {
    pub name: String,
    pub resolution: Resolution,
    /// True when the values are the placeholder profile
    pub placeholder: bool,
    pub per_100g: Per100g,
}

/// Convert a quantity and unit to grams
pub fn convert_to_grams(quantity: f64, unit: &str) -> ConvertResponse {
    let conversion = convert_to_grams_detailed(quantity, unit);
    ConvertResponse {
        quantity,
        unit: unit.to_string(),
        grams: conversion.grams,
        source: conversion.source,
        category: conversion.category,
        estimated: conversion.estimated(),
    }
}

/// Guess grams from a free-text description
pub fn estimate_grams(description: &str, quantity: f64) -> EstimateResponse {
    EstimateResponse {
        description: description.to_string(),
        quantity,
        grams: estimate_grams_from_description(description, quantity),
    }
}

/// Nutrition for a serving given in any unit
pub fn calculate_serving_nutrition(
    per_100g: NutritionProfile,
    quantity: f64,
    unit: &str,
) -> MealItemNutrition {
    let conversion = convert_to_grams_detailed(quantity, unit);
    MealItemNutrition {
        name: None,
        grams: conversion.grams,
        estimated: conversion.estimated(),
        nutrition: calculate_nutrition_for_serving(&Per100g::new(per_100g), conversion.grams),
    }
}

/// Totals and macro split for a list of foods
pub fn calculate_meal_nutrition(items: Vec<MealItemInput>) -> MealNutritionResponse {
    let mut entries = Vec::with_capacity(items.len());
    let mut breakdown = Vec::with_capacity(items.len());

    for item in items {
        let conversion = convert_to_grams_detailed(item.quantity, &item.unit);
        let profile = Per100g::new(item.per_100g);
        entries.push(ServingEntry::new(profile, conversion.grams));
        breakdown.push(MealItemNutrition {
            name: item.name,
            grams: conversion.grams,
            estimated: conversion.estimated(),
            nutrition: calculate_nutrition_for_serving(&profile, conversion.grams),
        });
    }

    let total = calculate_total_nutrition(&entries);
    MealNutritionResponse {
        items: breakdown,
        macro_percentages: calculate_macro_percentages(&total),
        total,
    }
}

/// Sum meal totals into a day
pub fn calculate_daily_totals(meals: &[NutritionProfile]) -> DailyTotalsResponse {
    let total = sum_daily(meals);
    DailyTotalsResponse {
        meal_count: meals.len(),
        macro_percentages: calculate_macro_percentages(&total),
        total,
    }
}

/// Calorie share of each macronutrient
pub fn macro_percentages(profile: &NutritionProfile) -> MacroPercentages {
    calculate_macro_percentages(profile)
}

/// Look up per-100g nutrition for a food, falling back to the placeholder
pub async fn lookup_food_nutrition(catalog: &dyn NutritionCatalog, name: &str) -> LookupResponse {
    let (per_100g, resolution) = resolve_or_placeholder(catalog, name).await;
    LookupResponse {
        name: name.to_string(),
        placeholder: matches!(resolution, Resolution::NotFound | Resolution::Failed),
        resolution,
        per_100g,
    }
}
