//! Import a labeled dataset into the benchmark table
//! Usage: cargo run --bin import_benchmarks -- <dataset.json> [--replace]
//!
//! The dataset is a JSON array of items:
//! `{"id": "...", "name": "...", "image_ref": "...", "foods": [...], "totals": {...}}`

use nutrieval::config::Config;
use nutrieval::tools::benchmarks::{add_benchmark_item, AddBenchmarkItemInput};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    let Some(dataset_path) = args.get(1).filter(|a| !a.starts_with("--")) else {
        eprintln!("Usage: import_benchmarks <dataset.json> [--replace]");
        std::process::exit(2);
    };
    let replace = args.iter().any(|a| a == "--replace");

    let config = Config::from_env();
    println!("Database: {}", config.database_path.display());
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let database = nutrieval::db::Database::new(&config.database_path)?;
    database.with_conn(|conn| {
        nutrieval::db::migrations::run_migrations(conn)?;
        Ok(())
    })?;

    let text = std::fs::read_to_string(dataset_path)?;
    let items: Vec<AddBenchmarkItemInput> = serde_json::from_str(&text)?;
    println!("Importing {} items from {}", items.len(), dataset_path);

    let mut imported = 0;
    let mut failed = 0;
    for mut item in items {
        item.replace = item.replace || replace;
        let id = item.id.clone();
        match add_benchmark_item(&database, item) {
            Ok(saved) => {
                imported += 1;
                println!(
                    "  {} ({} foods, {:.0} kcal)",
                    saved.id, saved.food_count, saved.totals.calories
                );
            }
            Err(e) => {
                failed += 1;
                println!("  {} skipped: {}", id, e);
            }
        }
    }

    println!("Imported {}, skipped {}", imported, failed);
    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
