//! Nutrition calculation module
//!
//! Handles unit conversions, serving scaling and nutrition aggregation.

pub mod calculator;
pub mod converter;
pub mod units;

pub use calculator::{
    calculate_daily_totals, calculate_macro_percentages, calculate_nutrition_for_serving,
    calculate_total_nutrition, MacroPercentages, ServingEntry,
};
pub use converter::{
    convert_to_grams, convert_to_grams_detailed, estimate_grams_from_description,
    ConversionSource, GramConversion,
};
pub use units::{categorize_unit, grams_per_unit, normalize_unit, UnitCategory};
