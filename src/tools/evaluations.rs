//! Evaluation MCP Tools
//!
//! Score detections against benchmark items and keep a history of runs.

use serde::Serialize;

use crate::catalog::Resolution;
use crate::db::Database;
use crate::evaluation::{Evaluator, ItemEvaluation, Submission};
use crate::models::{
    BenchmarkItem, EvaluationResult, EvaluationResultCreate, EvaluationRun,
    EvaluationRunCreate,
};

/// Response for run_evaluation
#[derive(Debug, Serialize)]
pub struct RunEvaluationResponse {
    pub run: EvaluationRun,
    /// Foods scored with placeholder nutrition across the whole run
    pub placeholder_foods: usize,
    pub items: Vec<ItemScore>,
}

/// Compact per-item line of a run
#[derive(Debug, Serialize)]
pub struct ItemScore {
    pub item_id: String,
    pub f1_score: f64,
    pub calorie_accuracy: f64,
    pub overall_score: f64,
    pub resolutions: Vec<Resolution>,
    pub error: Option<String>,
}

impl From<&ItemEvaluation> for ItemScore {
    fn from(e: &ItemEvaluation) -> Self {
        Self {
            item_id: e.item_id.clone(),
            f1_score: e.metrics.f1_score,
            calorie_accuracy: e.metrics.calorie_accuracy,
            overall_score: e.metrics.overall_score,
            resolutions: e.resolutions.clone(),
            error: e.error.clone(),
        }
    }
}

/// A stored run with all of its results
#[derive(Debug, Serialize)]
pub struct RunDetail {
    pub run: EvaluationRun,
    pub results: Vec<EvaluationResult>,
}

/// Summary of a run for list results
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub id: i64,
    pub label: String,
    pub model: Option<String>,
    pub item_count: i64,
    pub failed_count: i64,
    pub overall_score: f64,
    pub created_at: String,
}

impl From<&EvaluationRun> for RunSummary {
    fn from(run: &EvaluationRun) -> Self {
        Self {
            id: run.id,
            label: run.label.clone(),
            model: run.model.clone(),
            item_count: run.item_count,
            failed_count: run.failed_count,
            overall_score: run.aggregated.overall_score,
            created_at: run.created_at.clone(),
        }
    }
}

/// Response for list_evaluation_runs
#[derive(Debug, Serialize)]
pub struct ListRunsResponse {
    pub runs: Vec<RunSummary>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

fn load_item(db: &Database, item_id: &str) -> Result<BenchmarkItem, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    BenchmarkItem::get_by_id(&conn, item_id)
        .map_err(|e| format!("Failed to get benchmark item: {}", e))?
        .ok_or_else(|| format!("Benchmark item '{}' not found", item_id))
}

/// Score one submission without storing it
pub async fn score_detection(
    db: &Database,
    evaluator: &Evaluator,
    submission: Submission,
) -> Result<ItemEvaluation, String> {
    let item = load_item(db, &submission.item_id)?;
    Ok(evaluator.evaluate_item(&item, submission).await)
}

/// Score a batch of submissions and store the run
pub async fn run_evaluation(
    db: &Database,
    evaluator: &Evaluator,
    label: String,
    model: Option<String>,
    submissions: Vec<Submission>,
) -> Result<RunEvaluationResponse, String> {
    if submissions.is_empty() {
        return Err("No submissions to evaluate".to_string());
    }

    let items = {
        let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
        BenchmarkItem::all(&conn).map_err(|e| format!("Failed to load benchmark items: {}", e))?
    };

    let report = evaluator.evaluate_batch(&items, submissions).await;

    let results: Vec<EvaluationResultCreate> =
        report.items.iter().map(ItemEvaluation::to_result_create).collect();
    let run = db
        .with_conn_mut(|conn| {
            EvaluationRun::create_with_results(
                conn,
                &EvaluationRunCreate {
                    label,
                    model,
                    aggregated: report.aggregated,
                },
                &results,
            )
        })
        .map_err(|e| format!("Failed to save evaluation run: {}", e))?;

    tracing::info!(
        "Stored evaluation run {} ({} items, overall {:.3})",
        run.id,
        run.item_count,
        run.aggregated.overall_score
    );

    Ok(RunEvaluationResponse {
        placeholder_foods: report.items.iter().map(ItemEvaluation::placeholder_count).sum(),
        items: report.items.iter().map(ItemScore::from).collect(),
        run,
    })
}

/// Get a stored run with its per-item results
pub fn get_evaluation_run(db: &Database, id: i64) -> Result<Option<RunDetail>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let Some(run) = EvaluationRun::get_by_id(&conn, id)
        .map_err(|e| format!("Failed to get evaluation run: {}", e))?
    else {
        return Ok(None);
    };

    let results = EvaluationRun::results(&conn, id)
        .map_err(|e| format!("Failed to get run results: {}", e))?;

    Ok(Some(RunDetail { run, results }))
}

/// List stored runs, newest first
pub fn list_evaluation_runs(
    db: &Database,
    limit: Option<i64>,
    offset: Option<i64>,
) -> Result<ListRunsResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let limit = limit.unwrap_or(20).clamp(1, 200);
    let offset = offset.unwrap_or(0).max(0);

    let runs = EvaluationRun::list(&conn, limit, offset)
        .map_err(|e| format!("Failed to list evaluation runs: {}", e))?;
    let total = EvaluationRun::count(&conn)
        .map_err(|e| format!("Failed to count evaluation runs: {}", e))?;

    Ok(ListRunsResponse {
        runs: runs.iter().map(RunSummary::from).collect(),
        total,
        limit,
        offset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::catalog::StaticCatalog;
    use crate::db::temp_database;
    use crate::models::{
        BenchmarkItemCreate, DetectedFood, GroundTruth, GroundTruthFood, NutritionProfile,
        Per100g,
    };

    fn seed(db: &Database) {
        db.with_conn(|conn| {
            BenchmarkItem::create(
                conn,
                &BenchmarkItemCreate {
                    id: "toast-1".to_string(),
                    name: "Toast".to_string(),
                    image_ref: None,
                    ground_truth: GroundTruth::from_foods(vec![GroundTruthFood {
                        name: "white toast".to_string(),
                        quantity: 2.0,
                        unit: "slice".to_string(),
                        calories: 159.0,
                        protein: 5.4,
                        carbs: 29.4,
                        fat: 2.0,
                    }]),
                },
            )
        })
        .unwrap();
    }

    fn evaluator() -> Evaluator {
        Evaluator::new(Arc::new(StaticCatalog::new().with(
            "toast",
            Per100g(NutritionProfile {
                calories: 265.0,
                protein: 9.0,
                carbs: 49.0,
                fat: 3.2,
                ..Default::default()
            }),
        )))
    }

    #[tokio::test]
    async fn test_score_detection_unknown_item() {
        let (_dir, db) = temp_database();
        let err = score_detection(&db, &evaluator(), Submission::detected("nope", Vec::new()))
            .await
            .unwrap_err();
        assert!(err.contains("not found"));
    }

    #[tokio::test]
    async fn test_run_is_stored() {
        let (_dir, db) = temp_database();
        seed(&db);

        let response = run_evaluation(
            &db,
            &evaluator(),
            "baseline".to_string(),
            Some("vision-v1".to_string()),
            vec![
                Submission::detected(
                    "toast-1",
                    vec![DetectedFood::new("toast", 2.0, "slices", 0.9)],
                ),
                Submission::failed("toast-1", "timeout"),
            ],
        )
        .await
        .unwrap();

        assert_eq!(response.run.item_count, 2);
        assert_eq!(response.run.failed_count, 1);
        assert_eq!(response.items[0].f1_score, 1.0);
        assert_eq!(response.placeholder_foods, 0);

        let detail = get_evaluation_run(&db, response.run.id).unwrap().unwrap();
        assert_eq!(detail.results.len(), 2);
        assert_eq!(detail.results[1].error.as_deref(), Some("timeout"));
        assert_eq!(detail.results[0].resolutions, vec![Resolution::Catalog]);
        assert!(detail.results[1].resolutions.is_empty());
        // 60g of toast at 265 kcal/100g
        assert_eq!(detail.results[0].ai_totals.unwrap().calories, 159.0);

        let list = list_evaluation_runs(&db, None, None).unwrap();
        assert_eq!(list.total, 1);
        assert_eq!(list.runs[0].label, "baseline");
        assert!((detail.run.aggregated.f1_score - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_empty_run_rejected() {
        let (_dir, db) = temp_database();
        assert!(run_evaluation(&db, &evaluator(), "x".to_string(), None, Vec::new())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_huge_quantities_keep_run_history_readable() {
        let (_dir, db) = temp_database();
        seed(&db);
        let evaluator = evaluator();

        run_evaluation(
            &db,
            &evaluator,
            "normal".to_string(),
            None,
            vec![Submission::detected(
                "toast-1",
                vec![DetectedFood::new("toast", 2.0, "slices", 0.9)],
            )],
        )
        .await
        .unwrap();

        let lard = Per100g(NutritionProfile {
            calories: 900.0,
            fat: 100.0,
            ..Default::default()
        });
        let response = run_evaluation(
            &db,
            &evaluator,
            "huge".to_string(),
            None,
            vec![
                Submission::detected(
                    "toast-1",
                    vec![DetectedFood::new("toast", 1e306, "kg", 0.9)],
                ),
                Submission::detected(
                    "toast-1",
                    vec![
                        DetectedFood::new("lard", 1e307, "g", 0.9).with_nutrition(lard),
                        DetectedFood::new("lard", 1e307, "g", 0.9).with_nutrition(lard),
                    ],
                ),
            ],
        )
        .await
        .unwrap();

        assert_eq!(response.run.failed_count, 1);
        assert!(response.run.aggregated.avg_quantity_error.is_finite());

        let list = list_evaluation_runs(&db, None, None).unwrap();
        assert_eq!(list.total, 2);
        assert_eq!(list.runs[0].label, "huge");

        let detail = get_evaluation_run(&db, response.run.id).unwrap().unwrap();
        assert_eq!(detail.results[0].detected[0].grams(), 0.0);
        assert!(detail.results[1].error.as_deref().unwrap().contains("overflow"));
    }
}
