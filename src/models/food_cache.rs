//! Cached catalog lookups
//!
//! Read-through storage for nutrition catalog results, keyed by normalized food name.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use super::Per100g;
use crate::db::{json_column, DbResult};

/// A catalog match stored for reuse
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedFood {
    pub query: String,
    pub source: String,
    pub source_id: Option<i64>,
    pub description: String,
    pub profile: Per100g,
    pub fetched_at: String,
}

impl CachedFood {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            query: row.get("query")?,
            source: row.get("source")?,
            source_id: row.get("source_id")?,
            description: row.get("description")?,
            profile: json_column(row, "profile")?,
            fetched_at: row.get("fetched_at")?,
        })
    }

    /// Look up a cached entry
    pub fn get(conn: &Connection, query: &str) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM food_cache WHERE query = ?1")?;

        let result = stmt.query_row([query], Self::from_row);
        match result {
            Ok(entry) => Ok(Some(entry)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Store an entry, replacing any previous one for the same query
    pub fn put(
        conn: &Connection,
        query: &str,
        source: &str,
        source_id: Option<i64>,
        description: &str,
        profile: &Per100g,
    ) -> DbResult<()> {
        let profile = serde_json::to_string(profile)?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO food_cache (query, source, source_id, description, profile)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![query, source, source_id, description, profile],
        )?;
        Ok(())
    }

    /// Count cached entries
    pub fn count(conn: &Connection) -> DbResult<i64> {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM food_cache", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use crate::models::NutritionProfile;

    #[test]
    fn test_put_and_get() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        assert!(CachedFood::get(&conn, "banana").unwrap().is_none());

        let profile = Per100g(NutritionProfile {
            calories: 89.0,
            protein: 1.1,
            carbs: 22.8,
            fat: 0.3,
            fiber: Some(2.6),
            sugar: Some(12.2),
            sodium: Some(1.0),
        });
        CachedFood::put(&conn, "banana", "usda", Some(173944), "Bananas, raw", &profile).unwrap();

        let cached = CachedFood::get(&conn, "banana").unwrap().unwrap();
        assert_eq!(cached.source_id, Some(173944));
        assert_eq!(cached.profile, profile);
        assert_eq!(CachedFood::count(&conn).unwrap(), 1);
    }
}
