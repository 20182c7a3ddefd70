//! Benchmark Item MCP Tools
//!
//! Tools for managing the labeled evaluation dataset.

use serde::{Deserialize, Serialize};

use crate::db::{Database, DbError};
use crate::models::{
    BenchmarkItem, BenchmarkItemCreate, GroundTruth, GroundTruthFood, NutrientTotals,
};

/// Input for add_benchmark_item
#[derive(Debug, Clone, Deserialize)]
pub struct AddBenchmarkItemInput {
    pub id: String,
    pub name: String,
    pub image_ref: Option<String>,
    pub foods: Vec<GroundTruthFood>,
    /// Stored totals; summed from the foods when omitted
    pub totals: Option<NutrientTotals>,
    /// Replace an existing item with the same ID instead of failing
    #[serde(default)]
    pub replace: bool,
}

impl AddBenchmarkItemInput {
    fn ground_truth(&self) -> GroundTruth {
        let mut ground_truth = GroundTruth::from_foods(self.foods.clone());
        if let Some(t) = self.totals {
            ground_truth.total_calories = t.calories;
            ground_truth.total_protein = t.protein;
            ground_truth.total_carbs = t.carbs;
            ground_truth.total_fat = t.fat;
        }
        ground_truth
    }
}

/// Response for add_benchmark_item
#[derive(Debug, Serialize)]
pub struct AddBenchmarkItemResponse {
    pub id: String,
    pub name: String,
    pub food_count: usize,
    pub totals: NutrientTotals,
    pub updated_at: String,
}

/// Summary of a benchmark item for list results
#[derive(Debug, Serialize)]
pub struct BenchmarkItemSummary {
    pub id: String,
    pub name: String,
    pub image_ref: Option<String>,
    pub food_count: usize,
    pub total_calories: f64,
}

impl From<&BenchmarkItem> for BenchmarkItemSummary {
    fn from(item: &BenchmarkItem) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            image_ref: item.image_ref.clone(),
            food_count: item.ground_truth.foods.len(),
            total_calories: item.ground_truth.total_calories,
        }
    }
}

/// Response for list_benchmark_items
#[derive(Debug, Serialize)]
pub struct ListBenchmarkItemsResponse {
    pub items: Vec<BenchmarkItemSummary>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Response for delete_benchmark_item
#[derive(Debug, Serialize)]
pub struct DeleteBenchmarkItemResponse {
    pub success: bool,
    pub message: String,
}

/// Add a labeled item to the dataset
pub fn add_benchmark_item(
    db: &Database,
    input: AddBenchmarkItemInput,
) -> Result<AddBenchmarkItemResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let data = BenchmarkItemCreate {
        ground_truth: input.ground_truth(),
        id: input.id.trim().to_string(),
        name: input.name,
        image_ref: input.image_ref,
    };
    if data.id.is_empty() {
        return Err("Benchmark item ID cannot be empty".to_string());
    }

    let result = if input.replace {
        BenchmarkItem::upsert(&conn, &data)
    } else {
        BenchmarkItem::create(&conn, &data)
    };

    let item = result.map_err(|e| match e {
        DbError::Duplicate(id) => format!(
            "Benchmark item '{}' already exists. Pass replace=true to overwrite it.",
            id
        ),
        other => format!("Failed to save benchmark item: {}", other),
    })?;

    tracing::info!("Saved benchmark item '{}'", item.id);

    Ok(AddBenchmarkItemResponse {
        food_count: item.ground_truth.foods.len(),
        totals: item.ground_truth.totals(),
        id: item.id,
        name: item.name,
        updated_at: item.updated_at,
    })
}

/// Get a benchmark item with its full ground truth
pub fn get_benchmark_item(db: &Database, id: &str) -> Result<Option<BenchmarkItem>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    BenchmarkItem::get_by_id(&conn, id)
        .map_err(|e| format!("Failed to get benchmark item: {}", e))
}

/// List benchmark items with pagination
pub fn list_benchmark_items(
    db: &Database,
    limit: Option<i64>,
    offset: Option<i64>,
) -> Result<ListBenchmarkItemsResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let limit = limit.unwrap_or(50).clamp(1, 500);
    let offset = offset.unwrap_or(0).max(0);

    let items = BenchmarkItem::list(&conn, limit, offset)
        .map_err(|e| format!("Failed to list benchmark items: {}", e))?;
    let total = BenchmarkItem::count(&conn)
        .map_err(|e| format!("Failed to count benchmark items: {}", e))?;

    Ok(ListBenchmarkItemsResponse {
        items: items.iter().map(BenchmarkItemSummary::from).collect(),
        total,
        limit,
        offset,
    })
}

/// Delete a benchmark item; stored run results for it are kept
pub fn delete_benchmark_item(
    db: &Database,
    id: &str,
) -> Result<DeleteBenchmarkItemResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let deleted = BenchmarkItem::delete(&conn, id)
        .map_err(|e| format!("Failed to delete benchmark item: {}", e))?;

    Ok(DeleteBenchmarkItemResponse {
        success: deleted,
        message: if deleted {
            format!("Benchmark item '{}' deleted", id)
        } else {
            format!("Benchmark item '{}' not found", id)
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::temp_database;

    fn food(name: &str, calories: f64) -> GroundTruthFood {
        GroundTruthFood {
            name: name.to_string(),
            quantity: 1.0,
            unit: "cup".to_string(),
            calories,
            protein: 4.0,
            carbs: 40.0,
            fat: 1.0,
        }
    }

    fn input(id: &str) -> AddBenchmarkItemInput {
        AddBenchmarkItemInput {
            id: id.to_string(),
            name: "Rice bowl".to_string(),
            image_ref: Some("images/rice.jpg".to_string()),
            foods: vec![food("rice", 200.0), food("beans", 220.0)],
            totals: None,
            replace: false,
        }
    }

    #[test]
    fn test_add_sums_totals() {
        let (_dir, db) = temp_database();
        let r = add_benchmark_item(&db, input("bowl-1")).unwrap();
        assert_eq!(r.food_count, 2);
        assert_eq!(r.totals.calories, 420.0);
    }

    #[test]
    fn test_duplicate_needs_replace() {
        let (_dir, db) = temp_database();
        add_benchmark_item(&db, input("bowl-1")).unwrap();

        let err = add_benchmark_item(&db, input("bowl-1")).unwrap_err();
        assert!(err.contains("replace=true"));

        let mut again = input("bowl-1");
        again.replace = true;
        again.name = "Renamed".to_string();
        assert_eq!(add_benchmark_item(&db, again).unwrap().name, "Renamed");
    }

    #[test]
    fn test_inconsistent_totals_rejected() {
        let (_dir, db) = temp_database();
        let mut bad = input("bowl-2");
        bad.totals = Some(NutrientTotals {
            calories: 900.0,
            protein: 8.0,
            carbs: 80.0,
            fat: 2.0,
        });
        let err = add_benchmark_item(&db, bad).unwrap_err();
        assert!(err.contains("calories"));
        assert!(get_benchmark_item(&db, "bowl-2").unwrap().is_none());
    }

    #[test]
    fn test_list_and_delete() {
        let (_dir, db) = temp_database();
        add_benchmark_item(&db, input("b")).unwrap();
        add_benchmark_item(&db, input("a")).unwrap();

        let list = list_benchmark_items(&db, None, None).unwrap();
        assert_eq!(list.total, 2);
        assert_eq!(list.items[0].id, "a");

        assert!(delete_benchmark_item(&db, "a").unwrap().success);
        assert!(!delete_benchmark_item(&db, "a").unwrap().success);
        assert_eq!(list_benchmark_items(&db, None, None).unwrap().total, 1);
    }
}
