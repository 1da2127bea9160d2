//! stockmetrics: flatten daily YAML prices, build master tables, compute metrics
//! artifacts and load the results into SQLite.
//!
//! Usage:
//!   cargo run -p data-loader -- etl
//!   cargo run -p data-loader -- master
//!   cargo run -p data-loader -- compute --top-n 10 --json
//!   cargo run -p data-loader -- load-db --with-metrics
//!   cargo run -p data-loader -- all

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use data_loader::{pipeline, PipelineConfig};
use metrics_core::PriceSource;
use metrics_engine::MetricsEngine;
use metrics_store::{MetricsStore, Table};

/// Stock metrics pipeline over daily equity prices
#[derive(Parser)]
#[command(name = "stockmetrics")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Flatten the raw YAML tree into prices_all.csv
    Etl {
        /// Raw YAML directory (overrides RAW_YAML_DIR)
        #[arg(long)]
        raw_dir: Option<PathBuf>,

        /// Skip the per-symbol CSV split
        #[arg(long)]
        no_split: bool,
    },

    /// Build symbols_master.csv and prices_master.csv
    Master,

    /// Compute every metrics artifact from the master tables
    Compute {
        /// Artifact directory (overrides PROCESSED_DIR)
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Leaderboard length
        #[arg(long, env = "TOP_N")]
        top_n: Option<usize>,

        /// Gainers and losers per month
        #[arg(long, env = "MOVERS_PER_MONTH")]
        movers_per_month: Option<usize>,

        /// Print the market summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load the master tables into SQLite
    LoadDb {
        /// Database URL (overrides DATABASE_URL)
        #[arg(long)]
        database_url: Option<String>,

        /// Also compute and load per-symbol metrics
        #[arg(long)]
        with_metrics: bool,
    },

    /// etl, master and compute in sequence
    All,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let mut config = PipelineConfig::from_env()?;

    match cli.command {
        Commands::Etl { raw_dir, no_split } => {
            if let Some(dir) = raw_dir {
                config.raw_yaml_dir = dir;
            }
            if no_split {
                config.split_per_symbol = false;
            }
            let summary = pipeline::etl(&config)?;
            tracing::info!(
                "ETL done: {} files ({} skipped), {} rows, {} symbols, {} bad records",
                summary.files_found,
                summary.files_skipped,
                summary.rows,
                summary.symbols,
                summary.records_skipped
            );
        }
        Commands::Master => pipeline::masters(&config)?,
        Commands::Compute {
            out_dir,
            top_n,
            movers_per_month,
            json,
        } => {
            if let Some(n) = top_n {
                config.top_n = n;
            }
            if let Some(n) = movers_per_month {
                config.movers_per_month = n;
            }
            config.validate()?;

            let out_dir = out_dir.unwrap_or_else(|| config.processed_dir.clone());
            let engine = MetricsEngine::new(config.engine_config());
            let outcome = pipeline::compute(&pipeline::master_source(&config), &engine, &out_dir)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome.report.market_summary)?);
            }
        }
        Commands::LoadDb {
            database_url,
            with_metrics,
        } => {
            let url = database_url.unwrap_or_else(|| config.database_url.clone());
            load_db(&config, &url, with_metrics).await?;
        }
        Commands::All => {
            let outcome = pipeline::run_all(&config)?;
            tracing::info!("Pipeline complete: {} artifacts", outcome.artifacts.len());
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json_logging {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn load_db(config: &PipelineConfig, database_url: &str, with_metrics: bool) -> Result<()> {
    tracing::info!("Connecting to {}", database_url);
    let store = MetricsStore::new(database_url).await?;

    let source = pipeline::master_source(config);
    let symbols = source.load_symbols()?;
    let prices = source.load_prices()?;

    store.replace_symbols(&symbols).await?;
    store.replace_prices(&prices).await?;

    if with_metrics {
        let engine = MetricsEngine::new(config.engine_config());
        let report = engine.run(&prices, &symbols)?;
        store.replace_symbol_metrics(&report.symbol_metrics).await?;
    }

    tracing::info!(
        "Database loaded: {} symbols, {} prices",
        store.count(Table::Symbols).await?,
        store.count(Table::Prices).await?
    );
    Ok(())
}
