//! Nutrieval
//!
//! An MCP server for nutrition calculation and food detection evaluation.

use std::sync::Arc;

use rmcp::ServiceExt;
use tokio::io::{stdin, stdout};
use tracing_subscriber::EnvFilter;

use nutrieval::build_info;
use nutrieval::catalog::{NutritionCatalog, UsdaCatalog};
use nutrieval::config::Config;
use nutrieval::db;
use nutrieval::mcp::NutrievalService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (output to stderr to not interfere with MCP stdio)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("nutrieval=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    build_info::print_startup_banner();
    eprintln!("Starting MCP server on stdio...");

    let config = Config::from_env();
    let db_path = config.database_path.clone();
    eprintln!("Database path: {}", db_path.display());

    // Ensure data directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    eprintln!("Initializing database...");
    let database = db::Database::new(&db_path)?;

    database.with_conn(|conn| {
        db::migrations::run_migrations(conn)?;
        let version = db::migrations::get_schema_version(conn)?;
        eprintln!("Database schema version: {}", version);
        Ok(())
    })?;

    let usda = UsdaCatalog::new(config.usda, Some(database.clone()))?;
    let catalog_configured = usda.is_configured();
    if !catalog_configured {
        tracing::warn!(
            "USDA_API_KEY not set; only cached foods resolve, others get placeholder nutrition"
        );
    }
    let catalog: Arc<dyn NutritionCatalog> = Arc::new(usda);

    let service = NutrievalService::new(db_path, database, catalog, catalog_configured);

    let server = service.serve((stdin(), stdout())).await?;
    server.waiting().await?;

    Ok(())
}
