//! deejay-ingest - song catalog command line
//!
//! Creates, verifies and tears down the catalog tables and ingests analyzer
//! output (JSON array or JSON Lines of song records).

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use deejay_common::config::{load_config, resolve_database_path};
use deejay_common::db::Table;
use deejay_ingest::db::schema::teardown_order;
use deejay_ingest::db::BatchReport;
use deejay_ingest::{ingest_all, load_records, Catalog};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for deejay-ingest
#[derive(Parser, Debug)]
#[command(name = "deejay-ingest")]
#[command(about = "Persist analyzed songs into a deduplicated catalog")]
#[command(version)]
struct Args {
    /// SQLite database file (overrides DEEJAY_DATABASE and the config file)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Bootstrap config file (defaults to DEEJAY_CONFIG or the platform config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create all catalog tables
    Init,
    /// Drop tables (all when none given)
    Drop { tables: Vec<String> },
    /// Delete all rows of tables (all when none given)
    Purge { tables: Vec<String> },
    /// Create unique indexes over each table's natural key
    Index,
    /// Ingest a JSON / JSON Lines file of song records
    Ingest { file: PathBuf },
    /// Report differences between the live and declared schema
    Verify,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref()).context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db_path = resolve_database_path(args.database.as_deref(), &config);
    info!("Database: {}", db_path.display());

    let catalog = Catalog::open(&db_path, config.store.clone())
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    match args.command {
        Command::Init => {
            if !catalog.create_all().await {
                bail!("Creating catalog tables failed");
            }
            info!("Catalog ready");
        }
        Command::Drop { tables } => {
            let report = catalog.drop_all(&table_names(tables)).await;
            finish_batch("drop", &report)?;
        }
        Command::Purge { tables } => {
            let report = catalog.delete_all(&table_names(tables)).await;
            finish_batch("purge", &report)?;
        }
        Command::Index => {
            let report = catalog.create_unique_indexes().await;
            finish_batch("index", &report)?;
        }
        Command::Ingest { file } => {
            let records = load_records(&file)
                .with_context(|| format!("Failed to load {}", file.display()))?;
            let summary = ingest_all(&catalog, records).await;

            println!("{}", serde_json::to_string_pretty(&summary)?);
            if summary.incomplete > 0 {
                warn!(incomplete = summary.incomplete, "Some records were only partially ingested");
            }
        }
        Command::Verify => {
            let Some(drift) = catalog.verify_schema().await else {
                bail!("Schema verification failed");
            };
            if drift.is_empty() {
                println!("Schema matches ({} tables)", Table::ALL.len());
            } else {
                for d in &drift {
                    println!("{}", d);
                }
                bail!("{} schema difference(s) found", drift.len());
            }
        }
    }

    Ok(())
}

fn table_names(requested: Vec<String>) -> Vec<String> {
    if requested.is_empty() {
        teardown_order().iter().map(|t| t.name().to_string()).collect()
    } else {
        requested
    }
}

fn finish_batch(operation: &str, report: &BatchReport) -> Result<()> {
    for table in &report.succeeded {
        println!("{} {}: ok", operation, table);
    }
    for (table, err) in &report.failed {
        error!(operation, table = %table, error = %err, "Batch step failed");
        println!("{} {}: FAILED ({})", operation, table, err);
    }
    if !report.is_success() {
        bail!("{} failed for {} table(s)", operation, report.failed.len());
    }
    Ok(())
}
