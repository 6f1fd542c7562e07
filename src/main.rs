//! # Listings CLI
//!
//! Command-line entry point: imports unit spreadsheets, applies migrations
//! and lists stored buildings. Results are printed to stdout as JSON; logs go
//! to stderr.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info};

use listings::{
    config::{AppConfig, ConfigLoader},
    db, geocoding,
    import::{FailureMode, Importer, parse_csv},
    repositories::{BuildingRepository, BuildingStore, UnitRepository, UnitStore},
    telemetry,
};

/// Command-line arguments for listings
#[derive(Parser, Debug)]
#[command(name = "listings")]
#[command(about = "Building and unit listings store with CSV import")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import units from a CSV spreadsheet
    Import {
        /// Path to the CSV file
        csv: PathBuf,

        /// fail-fast (default) or isolate
        #[arg(long)]
        failure_mode: Option<FailureMode>,

        /// Create only the first row for a unit number repeated within a building
        #[arg(long)]
        dedupe_within_batch: bool,

        /// Parse and print grouped rows without touching the store or geocoder
        #[arg(long)]
        dry_run: bool,
    },
    /// Apply pending database migrations
    Migrate,
    /// List stored buildings with their unit counts
    Buildings,
}

#[derive(Debug, Serialize)]
struct BuildingSummary {
    id: i32,
    address: String,
    city: String,
    state: String,
    zip_code: String,
    latitude: f64,
    longitude: f64,
    number_of_units: i32,
    stored_units: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::new()
        .load()
        .context("loading configuration")?;
    telemetry::init_tracing(&config).context("initializing tracing")?;
    info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted) = config.redacted_json() {
        debug!(config = %redacted, "Effective configuration");
    }

    match cli.command {
        Command::Import {
            csv,
            failure_mode,
            dedupe_within_batch,
            dry_run,
        } => {
            if dry_run {
                let grouped = parse_csv(&csv)
                    .await
                    .with_context(|| format!("parsing {}", csv.display()))?;
                print_json(&grouped)
            } else {
                run_import(&config, csv, failure_mode, dedupe_within_batch).await
            }
        }
        Command::Migrate => {
            let conn = db::init_pool(&config)
                .await
                .context("initializing database connection pool")?;
            let applied = db::migrate(&conn).await?;
            print_json(&serde_json::json!({ "applied": applied }))
        }
        Command::Buildings => list_buildings(&config).await,
    }
}

async fn run_import(
    config: &AppConfig,
    csv: PathBuf,
    failure_mode: Option<FailureMode>,
    dedupe_within_batch: bool,
) -> Result<()> {
    let conn = Arc::new(
        db::init_pool(config)
            .await
            .context("initializing database connection pool")?,
    );
    db::migrate(&conn).await?;

    let geocoder = geocoding::from_config(config).context("building geocoder")?;

    let mut options = config.import_options();
    if let Some(mode) = failure_mode {
        options.failure_mode = mode;
    }
    options.dedupe_within_batch |= dedupe_within_batch;

    let importer = Importer::new(
        Arc::new(BuildingRepository::new(conn.clone())),
        Arc::new(UnitRepository::new(conn)),
        geocoder,
        options,
    );
    let report = importer
        .import_file(&csv)
        .await
        .with_context(|| format!("importing {}", csv.display()))?;

    print_json(&report)
}

async fn list_buildings(config: &AppConfig) -> Result<()> {
    let conn = Arc::new(
        db::init_pool(config)
            .await
            .context("initializing database connection pool")?,
    );
    let buildings = BuildingRepository::new(conn.clone())
        .find_all()
        .await
        .context("querying buildings")?;
    let units = UnitRepository::new(conn)
        .find_all()
        .await
        .context("querying units")?;

    let mut unit_counts: HashMap<i32, usize> = HashMap::new();
    for unit in &units {
        *unit_counts.entry(unit.building_id).or_default() += 1;
    }

    let summaries: Vec<BuildingSummary> = buildings
        .into_iter()
        .map(|building| BuildingSummary {
            stored_units: unit_counts.get(&building.id).copied().unwrap_or_default(),
            id: building.id,
            address: building.address,
            city: building.city,
            state: building.state,
            zip_code: building.zip_code,
            latitude: building.latitude,
            longitude: building.longitude,
            number_of_units: building.number_of_units,
        })
        .collect();

    print_json(&summaries)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("serializing output")?;
    println!("{rendered}");
    Ok(())
}
