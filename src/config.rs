//! Runtime configuration
//!
//! Everything is read from environment variables; nothing is required.

use std::path::PathBuf;
use std::time::Duration;

use crate::catalog::{usda::DEFAULT_BASE_URL, UsdaConfig};

/// Database location override
pub const ENV_DATABASE_PATH: &str = "NUTRIEVAL_DATABASE_PATH";
/// FoodData Central API key
pub const ENV_USDA_API_KEY: &str = "USDA_API_KEY";
/// FoodData Central base URL
pub const ENV_USDA_API_BASE: &str = "USDA_API_BASE";
/// Catalog request timeout in seconds
pub const ENV_USDA_TIMEOUT_SECS: &str = "USDA_TIMEOUT_SECS";

const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Service configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub usda: UsdaConfig,
}

impl Config {
    /// Read configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any variable source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_path = lookup(ENV_DATABASE_PATH)
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_database_path);

        let api_key = lookup(ENV_USDA_API_KEY)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        let base_url = lookup(ENV_USDA_API_BASE)
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout_secs = match lookup(ENV_USDA_TIMEOUT_SECS) {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(
                    "Ignoring invalid {}='{}', using {}s",
                    ENV_USDA_TIMEOUT_SECS,
                    raw,
                    DEFAULT_TIMEOUT_SECS
                );
                DEFAULT_TIMEOUT_SECS
            }),
            None => DEFAULT_TIMEOUT_SECS,
        };

        Self {
            database_path,
            usda: UsdaConfig {
                api_key,
                base_url,
                timeout: Duration::from_secs(timeout_secs),
            },
        }
    }
}

/// `data/nutrieval.db` under the project root, found from the executable location
pub fn default_database_path() -> PathBuf {
    let mut path = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));

    // Go up from target/release or target/debug to project root
    if path.ends_with("release") || path.ends_with("debug") {
        if let Some(parent) = path.parent() {
            if let Some(grandparent) = parent.parent() {
                path = grandparent.to_path_buf();
            }
        }
    }

    path.push("data");
    path.push("nutrieval.db");
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert!(config.database_path.ends_with("data/nutrieval.db"));
        assert!(config.usda.api_key.is_none());
        assert_eq!(config.usda.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.usda.timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            (ENV_DATABASE_PATH, "/tmp/eval.db"),
            (ENV_USDA_API_KEY, " abc123 "),
            (ENV_USDA_API_BASE, "http://localhost:9000/fdc/"),
            (ENV_USDA_TIMEOUT_SECS, "3"),
        ]);
        assert_eq!(config.database_path, PathBuf::from("/tmp/eval.db"));
        assert_eq!(config.usda.api_key.as_deref(), Some("abc123"));
        assert_eq!(config.usda.base_url, "http://localhost:9000/fdc");
        assert_eq!(config.usda.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_blank_key_and_bad_timeout_ignored() {
        let config = config_from(&[(ENV_USDA_API_KEY, "  "), (ENV_USDA_TIMEOUT_SECS, "soon")]);
        assert!(config.usda.api_key.is_none());
        assert_eq!(config.usda.timeout, Duration::from_secs(15));
    }
}
