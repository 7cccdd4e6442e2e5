use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use adspend_core::{AppConfig, MetricsRange};
use adspend_fetch::{decode_csv, CsvFetcher};

/// Ingest one CSV batch from a local file or a direct-download URL.
///
/// When no `--source-file-name` is given, the file or URL basename is
/// stamped on the batch so re-ingests of the same export stay traceable.
///
/// # Errors
///
/// Returns an error if neither or both sources are given, the source cannot
/// be read or decoded, the batch is missing required columns, or the load
/// transaction fails (in which case the store is unchanged).
pub(crate) async fn run_ingest(
    pool: &PgPool,
    config: &AppConfig,
    file: Option<PathBuf>,
    url: Option<String>,
    source_file_name: Option<String>,
) -> anyhow::Result<()> {
    let (records, default_name) = match (file, url) {
        (Some(path), None) => {
            let bytes = std::fs::read(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let records = decode_csv(&bytes)?;
            (records, file_basename(&path))
        }
        (None, Some(url)) => {
            let fetcher = CsvFetcher::new(config.fetch_timeout_secs, &config.fetch_user_agent)?;
            let records = fetcher.fetch_record_set(&url).await?;
            (records, url_basename(&url))
        }
        _ => anyhow::bail!("provide exactly one of --file or --url"),
    };

    let source_file_name = source_file_name.or(default_name);
    let receipt =
        adspend_db::ingest_records(pool, records, source_file_name.as_deref()).await?;

    if receipt.nulled_fields > 0 {
        tracing::warn!(
            nulled_fields = receipt.nulled_fields,
            "some field values did not parse and were stored as NULL"
        );
    }

    println!(
        "ingested {} rows (store total {}, load_date {})",
        receipt.inserted_rows,
        receipt.total_rows,
        receipt.load_date.to_rfc3339()
    );
    Ok(())
}

/// Print the metrics snapshot for a date range.
///
/// # Errors
///
/// Returns an error if the aggregation query fails.
pub(crate) async fn run_metrics(
    pool: &PgPool,
    config: &AppConfig,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> anyhow::Result<()> {
    let range = MetricsRange::resolve(start, end, Utc::now().date_naive());
    let snapshot = adspend_db::get_metrics(pool, range, config.revenue_per_conversion).await?;

    println!("range:       {} .. {}", snapshot.start, snapshot.end);
    println!("spend:       {}", snapshot.total_spend);
    println!("conversions: {}", snapshot.total_conversions);
    println!("revenue:     {}", snapshot.total_revenue);
    println!("cac:         {}", format_ratio(snapshot.cac));
    println!("roas:        {}", format_ratio(snapshot.roas));
    Ok(())
}

/// Print the total row count of the store.
///
/// # Errors
///
/// Returns an error if the count query fails.
pub(crate) async fn run_count(pool: &PgPool) -> anyhow::Result<()> {
    let count = adspend_db::count_spend_rows(pool).await?;
    println!("{count} rows");
    Ok(())
}

fn format_ratio(value: Option<Decimal>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| v.to_string())
}

fn file_basename(path: &Path) -> Option<String> {
    path.file_name().map(|name| name.to_string_lossy().into_owned())
}

/// Last path segment of a URL, with any query string stripped.
fn url_basename(url: &str) -> Option<String> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let after_scheme = without_query
        .split_once("://")
        .map_or(without_query, |(_, rest)| rest);
    let (_host, path) = after_scheme.split_once('/')?;
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(ToString::to_string)
}
