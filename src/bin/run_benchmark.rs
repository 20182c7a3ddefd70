//! Score a file of detections against the stored benchmark and print a report
//! Usage: cargo run --bin run_benchmark -- <submissions.json> [--label NAME] [--model NAME]
//!
//! The submissions file is a JSON array of
//! `{"item_id": "...", "foods": [...]}` or `{"item_id": "...", "error": "..."}`.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use nutrieval::catalog::UsdaCatalog;
use nutrieval::config::Config;
use nutrieval::evaluation::{Evaluator, Submission};
use nutrieval::tools::{evaluations, reports};

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("nutrieval=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let Some(submissions_path) = args.get(1).filter(|a| !a.starts_with("--")) else {
        eprintln!("Usage: run_benchmark <submissions.json> [--label NAME] [--model NAME]");
        std::process::exit(2);
    };
    let label = flag_value(&args, "--label").unwrap_or_else(|| submissions_path.clone());
    let model = flag_value(&args, "--model");

    let config = Config::from_env();
    eprintln!("Database: {}", config.database_path.display());

    let database = nutrieval::db::Database::new(&config.database_path)?;
    database.with_conn(|conn| {
        nutrieval::db::migrations::run_migrations(conn)?;
        Ok(())
    })?;

    let text = std::fs::read_to_string(submissions_path)?;
    let submissions: Vec<Submission> = serde_json::from_str(&text)?;

    let catalog = UsdaCatalog::new(config.usda, Some(database.clone()))?;
    let evaluator = Evaluator::new(Arc::new(catalog));

    let response =
        evaluations::run_evaluation(&database, &evaluator, label, model, submissions).await?;
    if response.placeholder_foods > 0 {
        eprintln!(
            "{} foods had no catalog entry and were scored with placeholder nutrition",
            response.placeholder_foods
        );
    }

    let report = reports::export_evaluation_report(&database, response.run.id)?;
    println!("{}", report.markdown);

    Ok(())
}
