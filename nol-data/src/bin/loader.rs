use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use nol_core::NolLedger;
use nol_data::VintageLoader;
use nol_db_sqlite::SqliteRepository;

/// Load NOL vintage data from a CSV file into the database.
///
/// The CSV file should have the following columns:
/// - business_id: The owning business
/// - tax_year: The loss origination year
/// - jurisdiction: Jurisdiction code (FED, ST, MUN)
/// - entity_type: Entity type code (C, S, P, SP, LLC)
/// - loss_amount: The loss generated in the origination year
/// - apportionment_pct: Sub-federal apportionment percentage (empty for none)
/// - municipality_code: Municipality identifier (empty for none)
#[derive(Parser, Debug)]
#[command(name = "nol-data-loader")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the CSV file containing vintage data
    #[arg(short, long)]
    file: PathBuf,

    /// SQLite database URL (e.g., sqlite:nol.db?mode=rwc to create if missing)
    #[arg(short, long, default_value = "sqlite:nol.db?mode=rwc")]
    database: String,

    /// Run database migrations before loading data
    #[arg(short, long, default_value_t = false)]
    migrate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let repo = SqliteRepository::new(&args.database)
        .await
        .with_context(|| format!("Failed to connect to database: {}", args.database))?;

    if args.migrate {
        println!("Running migrations...");
        repo.run_migrations()
            .await
            .context("Failed to run migrations")?;
        println!("Migrations complete.");
    }

    println!("Loading NOL vintages from: {}", args.file.display());

    let file = File::open(&args.file)
        .with_context(|| format!("Failed to open: {}", args.file.display()))?;

    let records = VintageLoader::parse(file)
        .with_context(|| format!("Failed to parse CSV: {}", args.file.display()))?;

    println!("Parsed {} records from CSV", records.len());

    let ledger = NolLedger::new(repo);
    let created = VintageLoader::load(&ledger, &records)
        .await
        .context("Failed to load vintages into database")?;

    println!("Successfully loaded {} NOL vintages.", created);

    Ok(())
}
