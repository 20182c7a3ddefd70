//! Database migrations
//!
//! Schema creation and migration logic.

use rusqlite::Connection;

use super::connection::DbResult;

/// Current schema version
const SCHEMA_VERSION: i32 = 3;

/// Run all migrations to bring the database up to the current schema version
pub fn run_migrations(conn: &Connection) -> DbResult<()> {
    // Create migrations table if it doesn't exist
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])?;
    }

    if current_version < 2 {
        migrate_v2(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (2)", [])?;
    }

    if current_version < 3 {
        migrate_v3(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (3)", [])?;
    }

    tracing::debug!("Database schema at version {}", SCHEMA_VERSION);
    Ok(())
}

/// Get the currently applied schema version (0 for a fresh database)
pub fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

/// Migration v1: benchmark dataset and evaluation runs
fn migrate_v1(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- ============================================
        -- BENCHMARK ITEMS
        -- Hand-labeled images with their ground truth
        -- ============================================
        CREATE TABLE benchmark_items (
            id TEXT PRIMARY KEY,                 -- opaque, caller supplied
            name TEXT NOT NULL,
            image_ref TEXT,                      -- path or URL of the image, not validated
            ground_truth TEXT NOT NULL,          -- JSON GroundTruth
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_benchmark_items_name ON benchmark_items(name);

        -- ============================================
        -- EVALUATION RUNS
        -- One scored batch of detections
        -- ============================================
        CREATE TABLE evaluation_runs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            label TEXT NOT NULL,
            model TEXT,                          -- vision model that produced the detections
            item_count INTEGER NOT NULL,
            failed_count INTEGER NOT NULL DEFAULT 0,
            aggregated TEXT NOT NULL,            -- JSON EvaluationMetrics (mean)
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE evaluation_results (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            run_id INTEGER NOT NULL REFERENCES evaluation_runs(id) ON DELETE CASCADE,
            item_id TEXT NOT NULL,               -- benchmark item id, may no longer exist
            detected TEXT NOT NULL,              -- JSON array of DetectedFood
            ai_totals TEXT,                      -- JSON NutrientTotals, NULL on failure
            metrics TEXT NOT NULL,               -- JSON EvaluationMetrics
            error TEXT,                          -- upstream failure annotation
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_evaluation_results_run ON evaluation_results(run_id);
        "#,
    )?;

    Ok(())
}

/// Migration v2: nutrition catalog cache
fn migrate_v2(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- ============================================
        -- FOOD CACHE
        -- Read-through cache of catalog lookups, never invalidated
        -- ============================================
        CREATE TABLE food_cache (
            query TEXT PRIMARY KEY,              -- normalized food name
            source TEXT NOT NULL,                -- e.g. "usda"
            source_id INTEGER,                   -- FoodData Central id
            description TEXT NOT NULL,
            profile TEXT NOT NULL,               -- JSON per-100g NutritionProfile
            fetched_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        "#,
    )?;

    Ok(())
}

/// Migration v3: how each detected food got its nutrition
fn migrate_v3(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- JSON array of Resolution, parallel to detected
        ALTER TABLE evaluation_results ADD COLUMN resolutions TEXT NOT NULL DEFAULT '[]';
        "#,
    )?;

    Ok(())
}
