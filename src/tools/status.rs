//! Status Tool
//!
//! Runtime status of the service and the usage guide handed to assistants.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::build_info::BuildInfo;

/// Evaluation workflow instructions for AI assistants
pub const EVALUATION_INSTRUCTIONS: &str = r#"
# Nutrieval Instructions

This guide explains how to score food detections with the Nutrieval tools.

## Overview

An evaluation compares what a vision model saw in a meal photo against a
hand-labeled **benchmark item**:
1. **Benchmark items** - Labeled foods with quantities and already scaled nutrition
2. **Submissions** - The foods a model detected for one item, or the error it hit
3. **Evaluation runs** - A scored batch of submissions, stored with per-item results

---

## Units

Quantities are converted to grams with a fixed table:

| Unit | Grams |
|------|-------|
| g | 1 |
| kg | 1000 |
| oz | 28.35 |
| lb | 453.59 |
| cup | 240 |
| fl oz | 30 |
| tbsp / tablespoon | 15 |
| tsp / teaspoon | 5 |
| piece / serving | 100 |
| slice | 30 |
| whole | 150 |
| small / medium / large | 80 / 120 / 180 |

Unknown units fall back to 100 g per unit. A trailing "s" is stripped before
falling back, so "cups" and "slices" work. Leave `unit` out of a detection and
the grams are guessed from the food's name instead.

---

## Adding Benchmark Items

```
add_benchmark_item(
  id: "meal-001",
  name: "Chicken and rice",
  foods: [
    {name: "grilled chicken breast", quantity: 150, unit: "g",
     calories: 247.5, protein: 46.5, carbs: 0, fat: 5.4},
    {name: "white rice", quantity: 1, unit: "cup",
     calories: 312, protein: 6.5, carbs: 67.2, fat: 0.7}
  ]
)
```

Totals are summed from the foods when omitted. Supplied totals must agree with
the foods to within 1 unit or the item is rejected.

---

## Scoring

### One detection
```
score_detection(item_id: "meal-001", foods: [
  {name: "chicken", quantity: 150, unit: "g", confidence: 0.95},
  {name: "rice", quantity: 1, unit: "cup", confidence: 0.9}
])
```

### A whole batch
```
run_evaluation(label: "gpt-vision baseline", submissions: [
  {item_id: "meal-001", foods: [...]},
  {item_id: "meal-002", error: "HTTP 500 from vision API"}
])
```

Failed submissions are kept in the run with all-zero metrics, so they pull the
averages down instead of disappearing.

### How foods match
Names are lowercased and whitespace is collapsed. Two names match when they
are equal or one contains the other, so "rice" matches "fried rice". Each
label can be claimed by only one detection.

### Overall score
```
overall = 0.4 * F1 + 0.3 * quantity_accuracy + 0.3 * calorie_accuracy
```

---

## Nutrition Lookup

Detected foods without their own `nutrition` are looked up in the food catalog.
Foods the catalog does not know get a placeholder profile
(100 kcal, 5 g protein, 15 g carbs, 3 g fat per 100 g). Every scored item,
live or stored, lists how each detected food was resolved (`provided`,
`catalog`, `not_found` or `failed`), and exported reports count the foods
scored with placeholder nutrition.

---

## Quick Reference

| Task | Tool |
|------|------|
| Convert a serving to grams | `convert_to_grams` |
| Nutrition for a meal | `calculate_meal_nutrition` |
| Add or replace a labeled item | `add_benchmark_item` |
| Score one detection | `score_detection` |
| Score a batch and store it | `run_evaluation` |
| Review a stored run | `get_evaluation_run` |
| Markdown report for a run | `export_evaluation_report` |
"#;

/// Runtime status of the service
#[derive(Debug, Clone, Serialize)]
pub struct NutrievalStatus {
    pub version: &'static str,
    pub build_profile: &'static str,
    pub compiled_at: &'static str,

    /// Database information
    pub database_path: String,
    pub database_size_bytes: Option<u64>,

    /// Whether catalog lookups can reach the network
    pub catalog_configured: bool,

    /// Process information
    pub uptime_seconds: u64,
    pub process_id: u32,
    pub memory_usage_bytes: u64,
}

/// Status tracker for collecting runtime information
pub struct StatusTracker {
    start_time: Instant,
    database_path: PathBuf,
    catalog_configured: bool,
}

impl StatusTracker {
    pub fn new(database_path: PathBuf, catalog_configured: bool) -> Self {
        Self {
            start_time: Instant::now(),
            database_path,
            catalog_configured,
        }
    }

    /// Get the current status
    pub fn get_status(&self) -> NutrievalStatus {
        let build_info = BuildInfo::current();

        let database_size_bytes = std::fs::metadata(&self.database_path)
            .ok()
            .map(|m| m.len());

        let pid = std::process::id();
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]));

        let memory_usage_bytes = sys
            .process(Pid::from_u32(pid))
            .map(|p| p.memory())
            .unwrap_or(0);

        NutrievalStatus {
            version: build_info.version,
            build_profile: build_info.profile,
            compiled_at: build_info.compiled_at,
            database_path: self.database_path.display().to_string(),
            database_size_bytes,
            catalog_configured: self.catalog_configured,
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: pid,
            memory_usage_bytes,
        }
    }
}
