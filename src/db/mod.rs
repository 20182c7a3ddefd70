//! Database module
//!
//! Handles SQLite connection and migrations.

pub mod connection;
pub mod migrations;

pub use connection::{Database, DbError, DbResult};
pub(crate) use connection::{json_column, json_column_opt};

/// Migrated database in a temporary directory, for tests
#[cfg(test)]
pub(crate) fn temp_database() -> (tempfile::TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(dir.path().join("test.db")).unwrap();
    db.with_conn(|conn| migrations::run_migrations(conn)).unwrap();
    (dir, db)
}
