//! Unit conversion functions
//!
//! Turns free-text serving descriptions into grams. Conversions never fail:
//! anything unrecognized degrades to a 100g-per-unit estimate.

use serde::{Deserialize, Serialize};

use super::units::{
    lookup_unit, normalize_unit, UnitCategory, DEFAULT_GRAMS_PER_UNIT, G_PER_CUP, G_PER_PIECE,
    G_PER_SLICE, G_PER_TBSP, G_PER_TSP, G_PER_WHOLE,
};

/// How a gram weight was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionSource {
    /// Exact match in the unit table
    Table,
    /// Matched after stripping a trailing "s"
    Plural,
    /// Unit not recognized, 100g per unit assumed
    Default,
    /// No unit given, weight guessed from keywords in the description
    Description,
}

/// Result of a gram conversion, tagged with how it was derived
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GramConversion {
    pub grams: f64,
    pub source: ConversionSource,
    /// Category of the matched unit, None for the default estimate
    pub category: Option<UnitCategory>,
}

impl GramConversion {
    /// True when the weight is a guess rather than a table conversion
    pub fn estimated(&self) -> bool {
        self.source.is_estimate()
    }
}

impl ConversionSource {
    pub fn is_estimate(&self) -> bool {
        matches!(self, ConversionSource::Default | ConversionSource::Description)
    }
}

/// Clamp a quantity to a finite, non-negative value
fn sanitize_quantity(quantity: f64) -> f64 {
    if quantity.is_finite() && quantity > 0.0 {
        quantity
    } else {
        0.0
    }
}

/// Multiply out a gram weight; a product too large for f64 counts as invalid
fn scaled_grams(quantity: f64, grams_per_unit: f64) -> f64 {
    let grams = quantity * grams_per_unit;
    if grams.is_finite() {
        grams
    } else {
        tracing::warn!(
            "Quantity {} at {}g per unit overflows, using 0g",
            quantity,
            grams_per_unit
        );
        0.0
    }
}

/// Convert a quantity in the given unit to grams, reporting how the factor was found
///
/// Examples:
/// - (2, "cup") -> 480g, Table
/// - (2, "Cups") -> 480g, Plural
/// - (2, "handful") -> 200g, Default
pub fn convert_to_grams_detailed(quantity: f64, unit: &str) -> GramConversion {
    let quantity = sanitize_quantity(quantity);
    let normalized = normalize_unit(unit);

    if let Some(e) = lookup_unit(&normalized) {
        return GramConversion {
            grams: scaled_grams(quantity, e.grams),
            source: ConversionSource::Table,
            category: Some(e.category),
        };
    }

    if let Some(singular) = normalized.strip_suffix('s') {
        if let Some(e) = lookup_unit(singular) {
            return GramConversion {
                grams: scaled_grams(quantity, e.grams),
                source: ConversionSource::Plural,
                category: Some(e.category),
            };
        }
    }

    tracing::debug!(
        "Unknown unit '{}', assuming {}g per unit for quantity {}",
        unit,
        DEFAULT_GRAMS_PER_UNIT,
        quantity
    );
    GramConversion {
        grams: scaled_grams(quantity, DEFAULT_GRAMS_PER_UNIT),
        source: ConversionSource::Default,
        category: None,
    }
}

/// Convert a quantity in the given unit to grams
///
/// Always returns a finite, non-negative value.
pub fn convert_to_grams(quantity: f64, unit: &str) -> f64 {
    convert_to_grams_detailed(quantity, unit).grams
}

/// Keyword heuristics for descriptions without an explicit unit, in priority order
const DESCRIPTION_KEYWORDS: &[(&[&str], f64)] = &[
    (&["whole"], G_PER_WHOLE),
    (&["slice"], G_PER_SLICE),
    (&["piece", "chunk"], G_PER_PIECE),
    (&["cup"], G_PER_CUP),
    (&["tablespoon", "tbsp"], G_PER_TBSP),
    (&["teaspoon", "tsp"], G_PER_TSP),
];

/// Estimate grams from a free-text description when no unit is available
///
/// The first keyword group found in the text decides the per-unit weight.
pub fn estimate_grams_from_description(description: &str, quantity: f64) -> f64 {
    let quantity = sanitize_quantity(quantity);
    let text = description.to_lowercase();

    let per_unit = DESCRIPTION_KEYWORDS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| text.contains(k)))
        .map(|(_, grams)| *grams)
        .unwrap_or(DEFAULT_GRAMS_PER_UNIT);

    scaled_grams(quantity, per_unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nutrition::units::UNIT_TABLE;

    #[test]
    fn test_every_table_unit_is_exact() {
        for e in UNIT_TABLE {
            assert_eq!(convert_to_grams(3.0, e.name), 3.0 * e.grams, "unit {}", e.name);
        }
    }

    #[test]
    fn test_case_and_whitespace_insensitive() {
        assert_eq!(convert_to_grams(1.0, "  CUP "), 240.0);
        assert_eq!(convert_to_grams(2.0, "Fl  Oz"), 60.0);
    }

    #[test]
    fn test_zero_quantity() {
        assert_eq!(convert_to_grams(0.0, "cup"), 0.0);
        assert_eq!(convert_to_grams(0.0, "zorbleflax"), 0.0);
    }

    #[test]
    fn test_plural_fallback() {
        assert_eq!(convert_to_grams(2.5, "cups"), convert_to_grams(2.5, "cup"));
        let conv = convert_to_grams_detailed(2.0, "Slices");
        assert_eq!(conv.grams, 60.0);
        assert_eq!(conv.source, ConversionSource::Plural);
        assert_eq!(conv.category, Some(UnitCategory::Count));
    }

    #[test]
    fn test_unknown_unit_defaults() {
        let conv = convert_to_grams_detailed(1.5, "zorbleflax");
        assert_eq!(conv.grams, 150.0);
        assert!(conv.estimated());
        assert_eq!(conv.category, None);
    }

    #[test]
    fn test_table_match_is_not_estimated() {
        let conv = convert_to_grams_detailed(2.0, "oz");
        assert!(!conv.estimated());
        assert_eq!(conv.source, ConversionSource::Table);
    }

    #[test]
    fn test_invalid_quantities_yield_zero() {
        assert_eq!(convert_to_grams(-2.0, "cup"), 0.0);
        assert_eq!(convert_to_grams(f64::NAN, "cup"), 0.0);
        assert_eq!(convert_to_grams(f64::INFINITY, "g"), 0.0);
    }

    #[test]
    fn test_overflowing_quantity_yields_zero() {
        assert_eq!(convert_to_grams(1e306, "kg"), 0.0);
        assert_eq!(convert_to_grams(f64::MAX, "cups"), 0.0);
        assert_eq!(convert_to_grams(1e307, "zorbleflax"), 0.0);
        assert_eq!(estimate_grams_from_description("a whole cake", 1e307), 0.0);

        let conv = convert_to_grams_detailed(1e306, "kg");
        assert_eq!(conv.source, ConversionSource::Table);
        assert!(conv.grams.is_finite());

        // Large but representable products are kept
        assert_eq!(convert_to_grams(1e300, "g"), 1e300);
    }

    #[test]
    fn test_estimate_from_description_priority() {
        assert_eq!(estimate_grams_from_description("1 whole apple", 1.0), 150.0);
        assert_eq!(estimate_grams_from_description("Slice of pizza", 2.0), 60.0);
        assert_eq!(estimate_grams_from_description("chunk of cheese", 1.0), 100.0);
        assert_eq!(estimate_grams_from_description("a cup of rice", 0.5), 120.0);
        assert_eq!(estimate_grams_from_description("tbsp butter", 2.0), 30.0);
        assert_eq!(estimate_grams_from_description("teaspoon sugar", 3.0), 15.0);
        // "whole" wins over "slice" when both appear
        assert_eq!(estimate_grams_from_description("whole loaf, one slice", 1.0), 150.0);
    }

    #[test]
    fn test_estimate_from_description_default() {
        assert_eq!(estimate_grams_from_description("some soup", 2.0), 200.0);
    }
}
