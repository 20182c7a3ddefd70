//! USDA FoodData Central catalog
//!
//! Searches FoodData Central for the best match of a food name and reads its
//! per-100g nutrients. Matches are kept in a read-through SQLite cache keyed by
//! normalized name; cached entries are never refreshed or evicted.
//!
//! API reference: <https://fdc.nal.usda.gov/api-guide.html>

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{CatalogError, CatalogMatch, NutritionCatalog};
use crate::db::Database;
use crate::evaluation::normalize_name;
use crate::models::{CachedFood, NutritionProfile, Per100g};

/// Default FoodData Central endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.nal.usda.gov/fdc/v1";

/// Cache source tag for USDA entries
const SOURCE: &str = "usda";

// ============================================================================
// Nutrient IDs
// ============================================================================

/// Energy (kcal)
pub const NUTRIENT_ENERGY: u32 = 1008;
/// Energy, Atwater general factors (kcal), used by Foundation foods
pub const NUTRIENT_ENERGY_ATWATER_GENERAL: u32 = 2047;
/// Energy, Atwater specific factors (kcal)
pub const NUTRIENT_ENERGY_ATWATER_SPECIFIC: u32 = 2048;
/// Protein (g)
pub const NUTRIENT_PROTEIN: u32 = 1003;
/// Total lipid / fat (g)
pub const NUTRIENT_FAT: u32 = 1004;
/// Carbohydrate, by difference (g)
pub const NUTRIENT_CARBS: u32 = 1005;
/// Fiber, total dietary (g)
pub const NUTRIENT_FIBER: u32 = 1079;
/// Sugars, total including NLEA (g)
pub const NUTRIENT_SUGAR: u32 = 2000;
/// Sugars, total (g), older records
pub const NUTRIENT_SUGAR_LEGACY: u32 = 1063;
/// Sodium, Na (mg)
pub const NUTRIENT_SODIUM: u32 = 1093;

/// USDA client configuration
#[derive(Debug, Clone)]
pub struct UsdaConfig {
    /// API key; without one only cached entries are served
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for UsdaConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

/// Search response body (only the fields used here)
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    foods: Vec<SearchFood>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchFood {
    fdc_id: i64,
    description: String,
    #[serde(default)]
    food_nutrients: Vec<SearchNutrient>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchNutrient {
    nutrient_id: Option<u32>,
    value: Option<f64>,
}

/// Build a per-100g profile from a search result's nutrient list
fn profile_from_nutrients(nutrients: &[SearchNutrient]) -> Per100g {
    let find = |ids: &[u32]| {
        ids.iter().find_map(|id| {
            nutrients
                .iter()
                .find(|n| n.nutrient_id == Some(*id))
                .and_then(|n| n.value)
        })
    };

    Per100g(NutritionProfile {
        calories: find(&[
            NUTRIENT_ENERGY,
            NUTRIENT_ENERGY_ATWATER_GENERAL,
            NUTRIENT_ENERGY_ATWATER_SPECIFIC,
        ])
        .unwrap_or(0.0),
        protein: find(&[NUTRIENT_PROTEIN]).unwrap_or(0.0),
        carbs: find(&[NUTRIENT_CARBS]).unwrap_or(0.0),
        fat: find(&[NUTRIENT_FAT]).unwrap_or(0.0),
        fiber: find(&[NUTRIENT_FIBER]),
        sugar: find(&[NUTRIENT_SUGAR, NUTRIENT_SUGAR_LEGACY]),
        sodium: find(&[NUTRIENT_SODIUM]),
    })
}

/// Nutrition catalog backed by USDA FoodData Central
pub struct UsdaCatalog {
    config: UsdaConfig,
    http_client: reqwest::Client,
    cache: Option<Database>,
}

impl UsdaCatalog {
    /// Create a catalog client, optionally caching matches in the given database
    pub fn new(config: UsdaConfig, cache: Option<Database>) -> Result<Self, CatalogError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            config,
            http_client,
            cache,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Read a cached match; SQLite runs on the blocking pool
    async fn cached(&self, key: &str) -> Result<Option<CatalogMatch>, CatalogError> {
        let Some(db) = self.cache.clone() else {
            return Ok(None);
        };

        let key = key.to_string();
        let entry = tokio::task::spawn_blocking(move || {
            db.with_conn(|conn| CachedFood::get(conn, &key))
        })
        .await??;

        Ok(entry.map(|e| CatalogMatch {
            description: e.description,
            source_id: e.source_id,
            profile: e.profile,
        }))
    }

    async fn store(&self, key: &str, found: &CatalogMatch) -> Result<(), CatalogError> {
        let Some(db) = self.cache.clone() else {
            return Ok(());
        };

        let key = key.to_string();
        let found = found.clone();
        tokio::task::spawn_blocking(move || {
            db.with_conn(|conn| {
                CachedFood::put(
                    conn,
                    &key,
                    SOURCE,
                    found.source_id,
                    &found.description,
                    &found.profile,
                )
            })
        })
        .await??;

        Ok(())
    }

    /// Search FoodData Central and return the top hit
    async fn search(
        &self,
        api_key: &str,
        query: &str,
    ) -> Result<Option<CatalogMatch>, CatalogError> {
        let url = format!("{}/foods/search", self.config.base_url.trim_end_matches('/'));
        let response = self
            .http_client
            .get(&url)
            .query(&[("query", query), ("pageSize", "1"), ("api_key", api_key)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let body: SearchResponse = response.json().await?;
        Ok(body.foods.into_iter().next().map(|food| CatalogMatch {
            profile: profile_from_nutrients(&food.food_nutrients),
            description: food.description,
            source_id: Some(food.fdc_id),
        }))
    }
}

#[async_trait]
impl NutritionCatalog for UsdaCatalog {
    async fn lookup(&self, name: &str) -> Result<Option<CatalogMatch>, CatalogError> {
        let key = normalize_name(name);
        if key.is_empty() {
            return Ok(None);
        }

        match self.cached(&key).await {
            Ok(Some(hit)) => {
                tracing::debug!("Food cache hit for '{}'", key);
                return Ok(Some(hit));
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Food cache read for '{}' failed: {}", key, e),
        }

        let Some(api_key) = self.config.api_key.as_deref() else {
            tracing::debug!("USDA_API_KEY not set, no lookup for '{}'", key);
            return Ok(None);
        };

        let found = self.search(api_key, &key).await?;
        match &found {
            Some(m) => {
                tracing::info!(
                    "USDA match for '{}': {} ({:?})",
                    key,
                    m.description,
                    m.source_id
                );
                if let Err(e) = self.store(&key, m).await {
                    tracing::warn!("Food cache write for '{}' failed: {}", key, e);
                }
            }
            None => tracing::debug!("USDA has no match for '{}'", key),
        }

        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::temp_database;

    const BANANA: &str = r#"{
        "totalHits": 1,
        "foods": [{
            "fdcId": 173944,
            "description": "Bananas, raw",
            "dataType": "SR Legacy",
            "foodNutrients": [
                {"nutrientId": 1003, "nutrientName": "Protein", "unitName": "G", "value": 1.09},
                {"nutrientId": 1004, "nutrientName": "Total lipid (fat)", "unitName": "G", "value": 0.33},
                {"nutrientId": 1005, "nutrientName": "Carbohydrate, by difference", "unitName": "G", "value": 22.8},
                {"nutrientId": 1008, "nutrientName": "Energy", "unitName": "KCAL", "value": 89},
                {"nutrientId": 2000, "nutrientName": "Sugars, total including NLEA", "unitName": "G", "value": 12.2},
                {"nutrientId": 1079, "nutrientName": "Fiber, total dietary", "unitName": "G", "value": 2.6},
                {"nutrientId": 1093, "nutrientName": "Sodium, Na", "unitName": "MG", "value": 1}
            ]
        }]
    }"#;

    fn config(base_url: String) -> UsdaConfig {
        UsdaConfig {
            api_key: Some("test-key".to_string()),
            base_url,
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_profile_from_nutrients() {
        let body: SearchResponse = serde_json::from_str(BANANA).unwrap();
        let profile = profile_from_nutrients(&body.foods[0].food_nutrients);
        assert_eq!(profile.profile().calories, 89.0);
        assert_eq!(profile.profile().protein, 1.09);
        assert_eq!(profile.profile().sugar, Some(12.2));
        assert_eq!(profile.profile().sodium, Some(1.0));
    }

    #[test]
    fn test_missing_optionals_stay_absent() {
        let nutrients = vec![
            SearchNutrient { nutrient_id: Some(2047), value: Some(120.0) },
            SearchNutrient { nutrient_id: Some(1003), value: None },
        ];
        let profile = profile_from_nutrients(&nutrients);
        assert_eq!(profile.profile().calories, 120.0);
        assert_eq!(profile.profile().protein, 0.0);
        assert_eq!(profile.profile().fiber, None);
    }

    #[tokio::test]
    async fn test_lookup_reads_through_cache() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/foods/search")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("query".into(), "banana".into()),
                mockito::Matcher::UrlEncoded("api_key".into(), "test-key".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(BANANA)
            .expect(1)
            .create_async()
            .await;

        let (_dir, db) = temp_database();
        let catalog = UsdaCatalog::new(config(server.url()), Some(db.clone())).unwrap();

        let first = catalog.lookup("Banana").await.unwrap().unwrap();
        assert_eq!(first.source_id, Some(173944));
        assert_eq!(first.profile.profile().calories, 89.0);

        // Second lookup is served from SQLite
        let second = catalog.lookup("  banana ").await.unwrap().unwrap();
        assert_eq!(second, first);
        mock.assert_async().await;

        let cached = db.with_conn(|conn| CachedFood::count(conn)).unwrap();
        assert_eq!(cached, 1);
    }

    #[tokio::test]
    async fn test_lookup_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/foods/search")
            .match_query(mockito::Matcher::Any)
            .with_status(403)
            .with_body("invalid api key")
            .create_async()
            .await;

        let catalog = UsdaCatalog::new(config(server.url()), None).unwrap();
        let err = catalog.lookup("banana").await.unwrap_err();
        assert!(matches!(err, CatalogError::Status { status: 403, .. }));
    }

    #[tokio::test]
    async fn test_empty_search_is_no_match() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/foods/search")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"totalHits": 0, "foods": []}"#)
            .create_async()
            .await;

        let catalog = UsdaCatalog::new(config(server.url()), None).unwrap();
        assert!(catalog.lookup("zorbleflax").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_without_api_key_no_request_is_made() {
        let catalog = UsdaCatalog::new(UsdaConfig::default(), None).unwrap();
        assert!(!catalog.is_configured());
        assert!(catalog.lookup("banana").await.unwrap().is_none());
    }

    fn mock_banana(server: &mut mockito::ServerGuard) -> mockito::Mock {
        server
            .mock("GET", "/foods/search")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(BANANA)
    }

    #[tokio::test]
    async fn test_cache_write_failure_keeps_match() {
        let mut server = mockito::Server::new_async().await;
        let _mock = mock_banana(&mut server).create_async().await;

        let (_dir, db) = temp_database();
        db.with_conn(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER reject_cache BEFORE INSERT ON food_cache
                 BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
            )?;
            Ok(())
        })
        .unwrap();

        let catalog = UsdaCatalog::new(config(server.url()), Some(db.clone())).unwrap();
        let found = catalog.lookup("banana").await.unwrap().unwrap();
        assert_eq!(found.profile.profile().calories, 89.0);
        assert_eq!(db.with_conn(|conn| CachedFood::count(conn)).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cache_read_failure_falls_through_to_search() {
        let mut server = mockito::Server::new_async().await;
        let mock = mock_banana(&mut server).expect(1).create_async().await;

        let (_dir, db) = temp_database();
        db.with_conn(|conn| {
            conn.execute_batch("DROP TABLE food_cache")?;
            Ok(())
        })
        .unwrap();

        let catalog = UsdaCatalog::new(config(server.url()), Some(db)).unwrap();
        let found = catalog.lookup("banana").await.unwrap().unwrap();
        assert_eq!(found.source_id, Some(173944));
        mock.assert_async().await;
    }
}
