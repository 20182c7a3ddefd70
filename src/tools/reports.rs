//! Report generation tools
//!
//! Markdown summaries of stored evaluation runs.

use serde::Serialize;

use crate::catalog::Resolution;
use crate::db::Database;
use crate::models::{EvaluationMetrics, EvaluationResult, EvaluationRun};

/// Response for export_evaluation_report
#[derive(Debug, Serialize)]
pub struct ExportReportResponse {
    pub run_id: i64,
    pub markdown: String,
}

fn pct(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

fn metrics_table(m: &EvaluationMetrics) -> String {
    let rows = [
        ("Overall score", pct(m.overall_score)),
        ("Precision", pct(m.precision)),
        ("Recall", pct(m.recall)),
        ("F1", pct(m.f1_score)),
        ("Food detection accuracy", pct(m.food_detection_accuracy)),
        ("Quantity accuracy", pct(m.quantity_accuracy)),
        ("Avg quantity error", pct(m.avg_quantity_error)),
        ("Calorie accuracy", pct(m.calorie_accuracy)),
        ("Protein accuracy", pct(m.protein_accuracy)),
        ("Carbs accuracy", pct(m.carbs_accuracy)),
        ("Fat accuracy", pct(m.fat_accuracy)),
    ];

    let mut table = String::from("| Metric | Value |\n|--------|-------|\n");
    for (name, value) in rows {
        table.push_str(&format!("| {} | {} |\n", name, value));
    }
    table
}

/// Render a stored run and its results as Markdown
pub fn render_run_markdown(run: &EvaluationRun, results: &[EvaluationResult]) -> String {
    let mut markdown = String::new();

    // Header
    markdown.push_str(&format!("# Evaluation Run #{}: {}\n\n", run.id, run.label));
    if let Some(ref model) = run.model {
        markdown.push_str(&format!("**Model:** {}\n\n", model));
    }
    markdown.push_str(&format!("**Date:** {}\n\n", run.created_at));
    markdown.push_str(&format!(
        "**Items:** {} ({} failed)\n\n",
        run.item_count, run.failed_count
    ));
    markdown.push_str("---\n\n");

    markdown.push_str("## Aggregated Metrics\n\n");
    markdown.push_str(&metrics_table(&run.aggregated));
    markdown.push('\n');

    markdown.push_str("## Items\n\n");
    if results.is_empty() {
        markdown.push_str("*No results recorded.*\n\n");
    } else {
        markdown.push_str("| Item | Detected | F1 | Quantity | Calories | Overall | Note |\n");
        markdown.push_str("|------|----------|----|----------|----------|---------|------|\n");
        for r in results {
            let calories = r
                .ai_totals
                .map(|t| format!("{:.0} kcal ({})", t.calories, pct(r.metrics.calorie_accuracy)))
                .unwrap_or_else(|| "-".to_string());
            markdown.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} | {} |\n",
                r.item_id,
                r.detected.len(),
                pct(r.metrics.f1_score),
                pct(r.metrics.quantity_accuracy),
                calories,
                pct(r.metrics.overall_score),
                r.error.as_deref().unwrap_or(""),
            ));
        }
        markdown.push('\n');
    }

    let estimated: usize = results
        .iter()
        .flat_map(|r| r.detected.iter())
        .filter(|f| f.serving.is_estimated())
        .count();
    if estimated > 0 {
        markdown.push_str(&format!(
            "*{} detected serving(s) had no recognized unit and used an estimated weight.*\n\n",
            estimated
        ));
    }

    let placeholders = results
        .iter()
        .flat_map(|r| r.resolutions.iter())
        .filter(|r| matches!(r, Resolution::NotFound | Resolution::Failed))
        .count();
    if placeholders > 0 {
        markdown.push_str(&format!(
            "*{} food(s) had no catalog match and were scored with placeholder nutrition.*\n\n",
            placeholders
        ));
    }

    markdown.push_str("---\n\n");
    markdown.push_str(&format!(
        "*Generated: {}*\n",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));

    markdown
}

/// Export a stored run as a Markdown report
pub fn export_evaluation_report(
    db: &Database,
    run_id: i64,
) -> Result<ExportReportResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let run = EvaluationRun::get_by_id(&conn, run_id)
        .map_err(|e| format!("Failed to get evaluation run: {}", e))?
        .ok_or_else(|| format!("Evaluation run {} not found", run_id))?;
    let results = EvaluationRun::results(&conn, run_id)
        .map_err(|e| format!("Failed to get run results: {}", e))?;

    Ok(ExportReportResponse {
        run_id,
        markdown: render_run_markdown(&run, &results),
    })
}
