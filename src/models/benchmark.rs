//! Benchmark Item model
//!
//! A labeled image in the evaluation dataset.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use super::GroundTruth;
use crate::db::{json_column, DbError, DbResult};

/// A benchmark image with its ground truth
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkItem {
    pub id: String,
    pub name: String,
    pub image_ref: Option<String>,
    pub ground_truth: GroundTruth,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for creating a new benchmark item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkItemCreate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image_ref: Option<String>,
    pub ground_truth: GroundTruth,
}

impl BenchmarkItem {
    /// Create a BenchmarkItem from a database row
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            image_ref: row.get("image_ref")?,
            ground_truth: json_column(row, "ground_truth")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Insert a new benchmark item after checking its ground truth totals
    pub fn create(conn: &Connection, data: &BenchmarkItemCreate) -> DbResult<Self> {
        data.ground_truth.check_totals()?;

        if Self::get_by_id(conn, &data.id)?.is_some() {
            return Err(DbError::Duplicate(data.id.clone()));
        }

        let ground_truth = serde_json::to_string(&data.ground_truth)?;
        conn.execute(
            "INSERT INTO benchmark_items (id, name, image_ref, ground_truth)
             VALUES (?1, ?2, ?3, ?4)",
            params![data.id, data.name, data.image_ref, ground_truth],
        )?;

        Self::get_by_id(conn, &data.id)?.ok_or_else(|| {
            DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows)
        })
    }

    /// Insert or replace a benchmark item (used by dataset imports)
    pub fn upsert(conn: &Connection, data: &BenchmarkItemCreate) -> DbResult<Self> {
        data.ground_truth.check_totals()?;

        let ground_truth = serde_json::to_string(&data.ground_truth)?;
        conn.execute(
            r#"
            INSERT INTO benchmark_items (id, name, image_ref, ground_truth)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                image_ref = excluded.image_ref,
                ground_truth = excluded.ground_truth,
                updated_at = datetime('now')
            "#,
            params![data.id, data.name, data.image_ref, ground_truth],
        )?;

        Self::get_by_id(conn, &data.id)?.ok_or_else(|| {
            DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows)
        })
    }

    /// Get a benchmark item by ID
    pub fn get_by_id(conn: &Connection, id: &str) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM benchmark_items WHERE id = ?1")?;

        let result = stmt.query_row([id], Self::from_row);
        match result {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List benchmark items ordered by ID
    pub fn list(conn: &Connection, limit: i64, offset: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM benchmark_items ORDER BY id ASC LIMIT ?1 OFFSET ?2"
        )?;

        let items = stmt
            .query_map(params![limit, offset], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    /// Load every benchmark item
    pub fn all(conn: &Connection) -> DbResult<Vec<Self>> {
        Self::list(conn, -1, 0)
    }

    /// Count benchmark items
    pub fn count(conn: &Connection) -> DbResult<i64> {
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM benchmark_items", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Delete a benchmark item
    /// Returns Ok(true) if deleted, Ok(false) if not found
    pub fn delete(conn: &Connection, id: &str) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM benchmark_items WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}
