//! Evaluation Run model
//!
//! A persisted batch of scored detections and its per-item results.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use super::{DetectedFood, EvaluationMetrics, NutrientTotals};
use crate::catalog::Resolution;
use crate::db::{json_column, json_column_opt, DbError, DbResult};

/// A completed evaluation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRun {
    pub id: i64,
    pub label: String,
    pub model: Option<String>,
    pub item_count: i64,
    pub failed_count: i64,
    pub aggregated: EvaluationMetrics,
    pub created_at: String,
}

/// Data for creating a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRunCreate {
    pub label: String,
    pub model: Option<String>,
    pub aggregated: EvaluationMetrics,
}

/// One scored benchmark item within a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub id: i64,
    pub run_id: i64,
    pub item_id: String,
    pub detected: Vec<DetectedFood>,
    /// How each detected food got its nutrition, empty for failed items
    pub resolutions: Vec<Resolution>,
    pub ai_totals: Option<NutrientTotals>,
    pub metrics: EvaluationMetrics,
    pub error: Option<String>,
}

/// Data for creating a result row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResultCreate {
    pub item_id: String,
    pub detected: Vec<DetectedFood>,
    /// How each detected food got its nutrition, empty for failed items
    pub resolutions: Vec<Resolution>,
    pub ai_totals: Option<NutrientTotals>,
    pub metrics: EvaluationMetrics,
    pub error: Option<String>,
}

impl EvaluationRun {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            label: row.get("label")?,
            model: row.get("model")?,
            item_count: row.get("item_count")?,
            failed_count: row.get("failed_count")?,
            aggregated: json_column(row, "aggregated")?,
            created_at: row.get("created_at")?,
        })
    }

    /// Insert a run and all of its results in one transaction
    pub fn create_with_results(
        conn: &mut Connection,
        data: &EvaluationRunCreate,
        results: &[EvaluationResultCreate],
    ) -> DbResult<Self> {
        if !data.aggregated.is_finite() {
            let what = format!("aggregated metrics of run '{}'", data.label);
            return Err(DbError::NonFinite(what));
        }
        for r in results {
            if !r.metrics.is_finite() || r.ai_totals.is_some_and(|t| !t.is_finite()) {
                return Err(DbError::NonFinite(format!("result for item '{}'", r.item_id)));
            }
        }

        let failed_count = results.iter().filter(|r| r.error.is_some()).count() as i64;
        let aggregated = serde_json::to_string(&data.aggregated)?;

        let tx = conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO evaluation_runs (label, model, item_count, failed_count, aggregated)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![data.label, data.model, results.len() as i64, failed_count, aggregated],
        )?;
        let run_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO evaluation_results
                    (run_id, item_id, detected, resolutions, ai_totals, metrics, error)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )?;
            for r in results {
                let detected = serde_json::to_string(&r.detected)?;
                let resolutions = serde_json::to_string(&r.resolutions)?;
                let ai_totals = r.ai_totals.as_ref().map(serde_json::to_string).transpose()?;
                let metrics = serde_json::to_string(&r.metrics)?;
                stmt.execute(params![
                    run_id,
                    r.item_id,
                    detected,
                    resolutions,
                    ai_totals,
                    metrics,
                    r.error
                ])?;
            }
        }

        tx.commit()?;

        Self::get_by_id(conn, run_id)?.ok_or_else(|| {
            DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows)
        })
    }

    /// Get a run by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM evaluation_runs WHERE id = ?1")?;

        let result = stmt.query_row([id], Self::from_row);
        match result {
            Ok(run) => Ok(Some(run)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List runs, newest first
    pub fn list(conn: &Connection, limit: i64, offset: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM evaluation_runs ORDER BY id DESC LIMIT ?1 OFFSET ?2"
        )?;

        let runs = stmt
            .query_map(params![limit, offset], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(runs)
    }

    /// Count runs
    pub fn count(conn: &Connection) -> DbResult<i64> {
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM evaluation_runs", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Results of a run in insertion order
    pub fn results(conn: &Connection, run_id: i64) -> DbResult<Vec<EvaluationResult>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM evaluation_results WHERE run_id = ?1 ORDER BY id ASC"
        )?;

        let results = stmt
            .query_map([run_id], EvaluationResult::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(results)
    }
}

impl EvaluationResult {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            run_id: row.get("run_id")?,
            item_id: row.get("item_id")?,
            detected: json_column(row, "detected")?,
            resolutions: json_column(row, "resolutions")?,
            ai_totals: json_column_opt(row, "ai_totals")?,
            metrics: json_column(row, "metrics")?,
            error: row.get("error")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn result(item_id: &str, error: Option<&str>) -> EvaluationResultCreate {
        EvaluationResultCreate {
            item_id: item_id.to_string(),
            detected: vec![DetectedFood::new("rice", 1.0, "cup", 0.9)],
            resolutions: if error.is_some() {
                Vec::new()
            } else {
                vec![Resolution::NotFound]
            },
            ai_totals: error.is_none().then(|| NutrientTotals {
                calories: 200.0,
                protein: 4.0,
                carbs: 44.0,
                fat: 0.5,
            }),
            metrics: EvaluationMetrics {
                f1_score: if error.is_some() { 0.0 } else { 1.0 },
                ..Default::default()
            },
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn test_create_run_with_results() {
        let mut conn = setup();
        let run = EvaluationRun::create_with_results(
            &mut conn,
            &EvaluationRunCreate {
                label: "baseline".to_string(),
                model: Some("vision-large".to_string()),
                aggregated: EvaluationMetrics {
                    f1_score: 0.5,
                    ..Default::default()
                },
            },
            &[result("meal-001", None), result("meal-002", Some("timeout"))],
        )
        .unwrap();

        assert_eq!(run.item_count, 2);
        assert_eq!(run.failed_count, 1);
        assert_eq!(run.aggregated.f1_score, 0.5);

        let results = EvaluationRun::results(&conn, run.id).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].item_id, "meal-001");
        assert_eq!(results[0].detected[0].grams(), 240.0);
        assert!(results[0].ai_totals.is_some());
        assert_eq!(results[0].resolutions, vec![Resolution::NotFound]);
        assert_eq!(results[1].error.as_deref(), Some("timeout"));
        assert!(results[1].ai_totals.is_none());
    }

    #[test]
    fn test_list_runs_newest_first() {
        let mut conn = setup();
        for label in ["first", "second"] {
            EvaluationRun::create_with_results(
                &mut conn,
                &EvaluationRunCreate {
                    label: label.to_string(),
                    model: None,
                    aggregated: EvaluationMetrics::zeroed(),
                },
                &[],
            )
            .unwrap();
        }
        let runs = EvaluationRun::list(&conn, 10, 0).unwrap();
        assert_eq!(runs[0].label, "second");
        assert_eq!(EvaluationRun::count(&conn).unwrap(), 2);
        assert!(EvaluationRun::get_by_id(&conn, 99).unwrap().is_none());
    }

    #[test]
    fn test_non_finite_run_not_stored() {
        let mut conn = setup();
        let mut bad = result("meal-001", None);
        bad.metrics.avg_quantity_error = f64::INFINITY;

        let err = EvaluationRun::create_with_results(
            &mut conn,
            &EvaluationRunCreate {
                label: "broken".to_string(),
                model: None,
                aggregated: EvaluationMetrics::zeroed(),
            },
            &[bad],
        )
        .unwrap_err();
        assert!(matches!(err, DbError::NonFinite(_)));

        let err = EvaluationRun::create_with_results(
            &mut conn,
            &EvaluationRunCreate {
                label: "broken".to_string(),
                model: None,
                aggregated: EvaluationMetrics {
                    overall_score: f64::NAN,
                    ..Default::default()
                },
            },
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, DbError::NonFinite(_)));

        assert_eq!(EvaluationRun::count(&conn).unwrap(), 0);
        assert!(EvaluationRun::list(&conn, 10, 0).unwrap().is_empty());
    }
}
