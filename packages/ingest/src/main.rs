#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for loading and querying the crime incident dataset.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};
use crime_insights_analytics::QueryCatalog;
use crime_insights_analytics_models::Question;
use crime_insights_database::{PgIncidentStore, db, run_migrations};
use crime_insights_ingest::progress::{IndicatifProgress, init_logger};
use crime_insights_ingest::{
    DEFAULT_DATASET_URL, IngestError, SeedMode, fetch_dataset, load_file, seed,
};

#[derive(Parser)]
#[command(name = "crime_insights_ingest", about = "Crime incident dataset tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the incident dataset into the database
    Seed {
        /// Dataset URL (defaults to the DC open-data `GeoJSON` export)
        #[arg(long, conflicts_with = "file")]
        url: Option<String>,
        /// Read the dataset from a local file instead of downloading it
        #[arg(long)]
        file: Option<PathBuf>,
        /// Keep existing incidents instead of replacing them
        #[arg(long)]
        append: bool,
    },
    /// Run database migrations
    Migrate,
    /// Answer a catalog question (or `all`) and print the JSON result
    Ask {
        /// Question slug, e.g. "`top-ward`", or "all"
        question: String,
        /// Year for the offense ranking
        #[arg(long)]
        year: Option<i32>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = init_logger();
    let cli = Cli::parse();

    let db = db::connect_from_env().await?;

    match cli.command {
        Commands::Migrate => {
            log::info!("Running database migrations...");
            run_migrations(db.as_ref()).await?;
            log::info!("Migrations complete.");
        }
        Commands::Seed { url, file, append } => {
            let start = Instant::now();
            run_migrations(db.as_ref()).await?;

            let incidents = match file {
                Some(path) => load_file(&path)?,
                None => fetch_dataset(url.as_deref().unwrap_or(DEFAULT_DATASET_URL)).await?,
            };

            let store = PgIncidentStore::new(Arc::from(db));
            let mode = if append {
                SeedMode::Append
            } else {
                SeedMode::Replace
            };
            let progress = IndicatifProgress::records_bar(&multi, "Seeding");
            let summary = seed(&store, &incidents, mode, progress.as_ref()).await?;

            log::info!(
                "Seed complete: cleared {}, inserted {} in {:.1}s",
                summary.cleared,
                summary.inserted,
                start.elapsed().as_secs_f64()
            );
        }
        Commands::Ask { question, year } => {
            let catalog = QueryCatalog::new(Arc::new(PgIncidentStore::new(Arc::from(db))));

            let json = if question == "all" {
                serde_json::to_string_pretty(&catalog.answer_all().await?)?
            } else {
                let parsed: Question = question
                    .parse()
                    .map_err(|_| IngestError::UnknownQuestion { slug: question })?;
                serde_json::to_string_pretty(&catalog.answer(parsed, year).await?)?
            };

            println!("{json}");
        }
    }

    Ok(())
}
