//! Nutrition catalog
//!
//! Resolves food names to per-100g nutrition. Lookups that fail or find nothing
//! are replaced with a fixed placeholder profile by the caller.

pub mod usda;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::evaluation::normalize_name;
use crate::models::{NutritionProfile, Per100g};

pub use usda::{UsdaCatalog, UsdaConfig};

/// Profile used when a food has no catalog entry
pub const PLACEHOLDER_PROFILE: Per100g = Per100g(NutritionProfile {
    calories: 100.0,
    protein: 5.0,
    carbs: 15.0,
    fat: 3.0,
    fiber: Some(1.0),
    sugar: Some(2.0),
    sodium: Some(100.0),
});

/// Catalog error types
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Catalog returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Cache error: {0}")]
    Cache(#[from] crate::db::DbError),

    #[error("Cache task failed: {0}")]
    CacheTask(#[from] tokio::task::JoinError),
}

/// A catalog entry matched to a food name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogMatch {
    /// Catalog's own name for the food
    pub description: String,
    /// Catalog identifier, if the source has one
    pub source_id: Option<i64>,
    pub profile: Per100g,
}

/// Source of per-100g nutrition for named foods
#[async_trait]
pub trait NutritionCatalog: Send + Sync {
    /// Look up a food by name. `Ok(None)` means no entry exists.
    async fn lookup(&self, name: &str) -> Result<Option<CatalogMatch>, CatalogError>;
}

/// How a profile was obtained for a food
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Profile came with the detection
    Provided,
    Catalog,
    NotFound,
    Failed,
}

/// Look up a food and fall back to the placeholder profile
pub async fn resolve_or_placeholder(
    catalog: &dyn NutritionCatalog,
    name: &str,
) -> (Per100g, Resolution) {
    match catalog.lookup(name).await {
        Ok(Some(m)) => (m.profile, Resolution::Catalog),
        Ok(None) => {
            tracing::debug!("No catalog entry for '{}', using placeholder nutrition", name);
            (PLACEHOLDER_PROFILE, Resolution::NotFound)
        }
        Err(e) => {
            tracing::warn!(
                "Catalog lookup for '{}' failed: {}. Using placeholder nutrition.",
                name,
                e
            );
            (PLACEHOLDER_PROFILE, Resolution::Failed)
        }
    }
}

/// In-memory catalog keyed by normalized food name
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    entries: HashMap<String, Per100g>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, replacing any previous one with the same name
    pub fn insert(&mut self, name: &str, profile: Per100g) {
        self.entries.insert(normalize_name(name), profile);
    }

    pub fn with(mut self, name: &str, profile: Per100g) -> Self {
        self.insert(name, profile);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl NutritionCatalog for StaticCatalog {
    async fn lookup(&self, name: &str) -> Result<Option<CatalogMatch>, CatalogError> {
        let key = normalize_name(name);
        Ok(self.entries.get(&key).map(|profile| CatalogMatch {
            description: key.clone(),
            source_id: None,
            profile: *profile,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingCatalog;

    #[async_trait]
    impl NutritionCatalog for FailingCatalog {
        async fn lookup(&self, _name: &str) -> Result<Option<CatalogMatch>, CatalogError> {
            Err(CatalogError::Status {
                status: 503,
                body: "unavailable".to_string(),
            })
        }
    }

    fn apple() -> Per100g {
        Per100g(NutritionProfile {
            calories: 52.0,
            protein: 0.3,
            carbs: 14.0,
            fat: 0.2,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_static_catalog_normalizes_names() {
        let catalog = StaticCatalog::new().with("Green Apple", apple());
        let hit = catalog.lookup("  green   APPLE").await.unwrap().unwrap();
        assert_eq!(hit.profile, apple());
        assert!(catalog.lookup("pear").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_placeholder_on_miss() {
        let catalog = StaticCatalog::new();
        let (profile, resolution) = resolve_or_placeholder(&catalog, "mystery stew").await;
        assert_eq!(profile, PLACEHOLDER_PROFILE);
        assert_eq!(resolution, Resolution::NotFound);
    }

    #[tokio::test]
    async fn test_placeholder_on_error() {
        let (profile, resolution) = resolve_or_placeholder(&FailingCatalog, "apple").await;
        assert_eq!(profile.profile().calories, 100.0);
        assert_eq!(profile.profile().sodium, Some(100.0));
        assert_eq!(resolution, Resolution::Failed);
    }

    #[tokio::test]
    async fn test_resolved_from_catalog() {
        let catalog = StaticCatalog::new().with("apple", apple());
        let (profile, resolution) = resolve_or_placeholder(&catalog, "Apple").await;
        assert_eq!(profile, apple());
        assert_eq!(resolution, Resolution::Catalog);
    }
}
