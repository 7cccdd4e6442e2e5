mod commands;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "adspend-cli")]
#[command(about = "Ads spend ingest & metrics command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Ingest a CSV batch from a local file or a direct-download URL.
    Ingest {
        /// Path to a local CSV export.
        #[arg(long, conflicts_with = "url")]
        file: Option<PathBuf>,
        /// Direct-download URL of a CSV export.
        #[arg(long)]
        url: Option<String>,
        /// Provenance name stamped on the batch; defaults to the file or
        /// URL basename.
        #[arg(long)]
        source_file_name: Option<String>,
    },
    /// Aggregate CAC/ROAS over an inclusive date range.
    Metrics {
        /// Range start (YYYY-MM-DD); defaults to 29 days before end.
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Range end (YYYY-MM-DD); defaults to today.
        #[arg(long)]
        end: Option<NaiveDate>,
    },
    /// Print the total row count of the store.
    Count,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = adspend_core::load_app_config()?;
    let pool_config = adspend_db::PoolConfig::from_app_config(&config);
    let pool = adspend_db::connect_pool(&config.database_url, pool_config).await?;

    match cli.command {
        Commands::Ingest {
            file,
            url,
            source_file_name,
        } => commands::run_ingest(&pool, &config, file, url, source_file_name).await,
        Commands::Metrics { start, end } => commands::run_metrics(&pool, &config, start, end).await,
        Commands::Count => commands::run_count(&pool).await,
    }
}
