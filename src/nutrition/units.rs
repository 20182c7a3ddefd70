//! Unit types and conversion constants
//!
//! Provides the static serving-unit table used to turn detected quantities into grams.

use serde::{Deserialize, Serialize};

/// Category of a measurement unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitCategory {
    /// Weight/mass units (g, oz, lb, kg)
    Weight,
    /// Volume units, approximated as water-dense (cup, tbsp, tsp, fl oz)
    Volume,
    /// Informal count/size units (piece, slice, medium)
    Count,
}

/// One row of the serving-unit table
#[derive(Debug, Clone, Copy)]
pub struct UnitEntry {
    pub name: &'static str,
    pub grams: f64,
    pub category: UnitCategory,
}

// ============================================================================
// Volume Conversion Constants (to grams, water density)
// ============================================================================

/// Grams per cup
pub const G_PER_CUP: f64 = 240.0;
/// Grams per fluid ounce
pub const G_PER_FL_OZ: f64 = 30.0;
/// Grams per tablespoon
pub const G_PER_TBSP: f64 = 15.0;
/// Grams per teaspoon
pub const G_PER_TSP: f64 = 5.0;

// ============================================================================
// Weight Conversion Constants (to grams)
// ============================================================================

/// Grams per kilogram
pub const G_PER_KG: f64 = 1000.0;
/// Grams per ounce
pub const G_PER_OZ: f64 = 28.35;
/// Grams per pound
pub const G_PER_LB: f64 = 453.59;

// ============================================================================
// Count Estimates (to grams)
// ============================================================================

/// Grams assumed for one piece or one serving
pub const G_PER_PIECE: f64 = 100.0;
/// Grams assumed for one slice
pub const G_PER_SLICE: f64 = 30.0;
/// Grams assumed for one whole item
pub const G_PER_WHOLE: f64 = 150.0;
/// Grams assumed for a medium item
pub const G_PER_MEDIUM: f64 = 120.0;
/// Grams assumed for a large item
pub const G_PER_LARGE: f64 = 180.0;
/// Grams assumed for a small item
pub const G_PER_SMALL: f64 = 80.0;

/// Grams per unit when the unit is not recognized
pub const DEFAULT_GRAMS_PER_UNIT: f64 = 100.0;

const fn entry(name: &'static str, grams: f64, category: UnitCategory) -> UnitEntry {
    UnitEntry { name, grams, category }
}

/// The serving-unit table. Keys are lowercase with single internal spaces.
pub const UNIT_TABLE: &[UnitEntry] = &[
    entry("cup", G_PER_CUP, UnitCategory::Volume),
    entry("fl oz", G_PER_FL_OZ, UnitCategory::Volume),
    entry("tbsp", G_PER_TBSP, UnitCategory::Volume),
    entry("tablespoon", G_PER_TBSP, UnitCategory::Volume),
    entry("tsp", G_PER_TSP, UnitCategory::Volume),
    entry("teaspoon", G_PER_TSP, UnitCategory::Volume),
    entry("g", 1.0, UnitCategory::Weight),
    entry("kg", G_PER_KG, UnitCategory::Weight),
    entry("oz", G_PER_OZ, UnitCategory::Weight),
    entry("lb", G_PER_LB, UnitCategory::Weight),
    entry("piece", G_PER_PIECE, UnitCategory::Count),
    entry("serving", G_PER_PIECE, UnitCategory::Count),
    entry("slice", G_PER_SLICE, UnitCategory::Count),
    entry("whole", G_PER_WHOLE, UnitCategory::Count),
    entry("medium", G_PER_MEDIUM, UnitCategory::Count),
    entry("large", G_PER_LARGE, UnitCategory::Count),
    entry("small", G_PER_SMALL, UnitCategory::Count),
];

// ============================================================================
// Unit Recognition
// ============================================================================

/// Lowercase, trim and collapse internal whitespace
pub fn normalize_unit(unit: &str) -> String {
    unit.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Exact table lookup on an already normalized unit
pub fn lookup_unit(normalized: &str) -> Option<&'static UnitEntry> {
    UNIT_TABLE.iter().find(|e| e.name == normalized)
}

/// Get the conversion factor to grams for a unit, without any fallback
pub fn grams_per_unit(unit: &str) -> Option<f64> {
    lookup_unit(&normalize_unit(unit)).map(|e| e.grams)
}

/// Determine the category of a unit string, if it is in the table
pub fn categorize_unit(unit: &str) -> Option<UnitCategory> {
    lookup_unit(&normalize_unit(unit)).map(|e| e.category)
}
