//! Database operations for the `ad_spend` event-log table.
//!
//! The table is append-only and non-deduplicating: re-ingesting the same
//! source produces duplicate rows. Reconciliation belongs to a layer above
//! this store.

use adspend_core::{normalize_records, validate_columns, RawRecordSet, SchemaError, SpendRecord};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;

use crate::{LoadError, QueryError};

/// An ingest call failed before or during the load.
///
/// Field-level parse problems never appear here — they are recovered to NULL
/// by the normalizer. Only a missing-column batch or a failed transaction is
/// terminal.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Result of one successful ingest call.
#[derive(Debug, Clone)]
pub struct IngestReceipt {
    /// Rows written by this call; equals the input record count.
    pub inserted_rows: i64,
    /// Total rows in the store after the commit.
    pub total_rows: i64,
    /// The batch timestamp shared by every inserted row.
    pub load_date: DateTime<Utc>,
    /// Field values weakened to NULL during normalization, for caller logging.
    pub nulled_fields: u64,
}

/// Column arrays for the set-based insert, one entry per record.
#[derive(Default)]
struct SpendColumns {
    dates: Vec<Option<NaiveDate>>,
    platforms: Vec<Option<String>>,
    accounts: Vec<Option<String>>,
    campaigns: Vec<Option<String>>,
    countries: Vec<Option<String>>,
    devices: Vec<Option<String>>,
    spends: Vec<Option<Decimal>>,
    clicks: Vec<Option<i64>>,
    impressions: Vec<Option<i64>>,
    conversions: Vec<Option<i64>>,
    load_dates: Vec<DateTime<Utc>>,
    source_file_names: Vec<String>,
}

impl SpendColumns {
    fn from_records(records: &[SpendRecord]) -> Self {
        let mut columns = Self::default();
        for record in records {
            columns.dates.push(record.date);
            columns.platforms.push(record.platform.clone());
            columns.accounts.push(record.account.clone());
            columns.campaigns.push(record.campaign.clone());
            columns.countries.push(record.country.clone());
            columns.devices.push(record.device.clone());
            columns.spends.push(record.spend);
            columns.clicks.push(record.clicks);
            columns.impressions.push(record.impressions);
            columns.conversions.push(record.conversions);
            columns.load_dates.push(record.load_date);
            columns
                .source_file_names
                .push(record.source_file_name.clone());
        }
        columns
    }
}

/// Appends a normalized batch to `ad_spend` as one atomic unit.
///
/// A single transaction wraps a set-based `INSERT ... FROM UNNEST` with
/// explicit per-column casts matching the store schema, then reads the new
/// total row count before committing, so the returned pair is a consistent
/// snapshot. Any failure drops the transaction and rolls the whole batch
/// back — no partial batch is ever visible.
///
/// Returns `(inserted_rows, total_rows)`.
///
/// # Errors
///
/// Returns [`LoadError`] wrapping the underlying cause if the transaction
/// fails at any point.
pub async fn insert_spend_batch(
    pool: &PgPool,
    records: &[SpendRecord],
) -> Result<(i64, i64), LoadError> {
    let columns = SpendColumns::from_records(records);

    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(
        "INSERT INTO ad_spend \
             (date, platform, account, campaign, country, device, \
              spend, clicks, impressions, conversions, load_date, source_file_name) \
         SELECT * FROM UNNEST( \
             $1::date[], $2::text[], $3::text[], $4::text[], $5::text[], $6::text[], \
             $7::numeric(12,4)[], $8::bigint[], $9::bigint[], $10::bigint[], \
             $11::timestamptz[], $12::text[])",
    )
    .bind(&columns.dates)
    .bind(&columns.platforms)
    .bind(&columns.accounts)
    .bind(&columns.campaigns)
    .bind(&columns.countries)
    .bind(&columns.devices)
    .bind(&columns.spends)
    .bind(&columns.clicks)
    .bind(&columns.impressions)
    .bind(&columns.conversions)
    .bind(&columns.load_dates)
    .bind(&columns.source_file_names)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let total_rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ad_spend")
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok((i64::try_from(inserted).unwrap_or(i64::MAX), total_rows))
}

/// Runs the full ingest pipeline: validate columns, normalize types, load
/// the batch atomically.
///
/// Validation is all-or-nothing and happens before any row is touched, so a
/// schema failure leaves the store exactly as it was. Normalization never
/// drops rows; `inserted_rows` in the receipt always equals the input row
/// count on success.
///
/// # Errors
///
/// Returns [`IngestError::Schema`] when required columns are missing, or
/// [`IngestError::Load`] when the storage transaction fails (fully rolled
/// back).
pub async fn ingest_records(
    pool: &PgPool,
    records: RawRecordSet,
    source_file_name: Option<&str>,
) -> Result<IngestReceipt, IngestError> {
    let validated = validate_columns(records)?;
    let batch = normalize_records(&validated, source_file_name);
    let (inserted_rows, total_rows) = insert_spend_batch(pool, &batch.records).await?;

    Ok(IngestReceipt {
        inserted_rows,
        total_rows,
        load_date: batch.load_date,
        nulled_fields: batch.null_counts.total(),
    })
}

/// Returns the total number of rows in the store.
///
/// # Errors
///
/// Returns [`QueryError`] if the count query fails.
pub async fn count_spend_rows(pool: &PgPool) -> Result<i64, QueryError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ad_spend")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use adspend_core::REQUIRED_COLUMNS;

    fn record_set(rows: Vec<Vec<&str>>) -> RawRecordSet {
        RawRecordSet {
            columns: REQUIRED_COLUMNS.iter().map(|c| (*c).to_string()).collect(),
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(ToString::to_string).collect())
                .collect(),
        }
    }

    fn july_record_set() -> RawRecordSet {
        record_set(vec![
            vec![
                "2025-07-01",
                "google",
                "acct-1",
                "brand",
                "US",
                "mobile",
                "10",
                "100",
                "1000",
                "1",
            ],
            vec![
                "2025-07-02",
                "meta",
                "acct-1",
                "retarget",
                "US",
                "desktop",
                "20",
                "200",
                "2000",
                "2",
            ],
            vec![
                "2025-07-03",
                "google",
                "acct-2",
                "brand",
                "CA",
                "mobile",
                "30",
                "300",
                "3000",
                "0",
            ],
        ])
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn ingest_reports_inserted_and_total_rows(pool: PgPool) {
        let receipt = ingest_records(&pool, july_record_set(), Some("ads_spend.csv"))
            .await
            .expect("ingest");

        assert_eq!(receipt.inserted_rows, 3);
        assert_eq!(receipt.total_rows, 3);
        assert_eq!(receipt.nulled_fields, 0);
        assert_eq!(count_spend_rows(&pool).await.expect("count"), 3);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn ingest_is_not_idempotent_by_design(pool: PgPool) {
        let first = ingest_records(&pool, july_record_set(), Some("ads_spend.csv"))
            .await
            .expect("first ingest");
        let second = ingest_records(&pool, july_record_set(), Some("ads_spend.csv"))
            .await
            .expect("second ingest");

        assert_eq!(first.total_rows, 3);
        assert_eq!(second.inserted_rows, 3);
        assert_eq!(second.total_rows, 6);

        let duplicates: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM ad_spend WHERE date = '2025-07-01' AND spend = 10",
        )
        .fetch_one(&pool)
        .await
        .expect("duplicate count");
        assert_eq!(duplicates, 2);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn schema_failure_leaves_store_untouched(pool: PgPool) {
        let mut broken = july_record_set();
        broken.columns.retain(|c| c != "spend");
        for row in &mut broken.rows {
            row.remove(6);
        }

        let err = ingest_records(&pool, broken, None)
            .await
            .expect_err("missing column should fail");
        match err {
            IngestError::Schema(schema) => {
                assert_eq!(schema.missing, vec!["spend".to_string()]);
            }
            IngestError::Load(other) => panic!("expected schema error, got: {other}"),
        }

        assert_eq!(count_spend_rows(&pool).await.expect("count"), 0);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn unparsable_date_is_stored_as_null(pool: PgPool) {
        let set = record_set(vec![vec![
            "not-a-date",
            "google",
            "acct-1",
            "brand",
            "US",
            "mobile",
            "5",
            "10",
            "100",
            "1",
        ]]);

        let receipt = ingest_records(&pool, set, None).await.expect("ingest");
        assert_eq!(receipt.inserted_rows, 1);
        assert_eq!(receipt.nulled_fields, 1);

        let null_dates: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ad_spend WHERE date IS NULL")
            .fetch_one(&pool)
            .await
            .expect("null-date count");
        assert_eq!(null_dates, 1);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn batch_shares_one_load_date_and_source(pool: PgPool) {
        ingest_records(&pool, july_record_set(), Some("batch-7.csv"))
            .await
            .expect("ingest");

        let distinct: i64 = sqlx::query_scalar(
            "SELECT COUNT(DISTINCT (load_date, source_file_name)) FROM ad_spend",
        )
        .fetch_one(&pool)
        .await
        .expect("distinct batches");
        assert_eq!(distinct, 1);

        let source: String =
            sqlx::query_scalar("SELECT DISTINCT source_file_name FROM ad_spend")
                .fetch_one(&pool)
                .await
                .expect("source name");
        assert_eq!(source, "batch-7.csv");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn spend_amounts_survive_the_numeric_cast(pool: PgPool) {
        let set = record_set(vec![vec![
            "2025-07-01",
            "google",
            "acct-1",
            "brand",
            "US",
            "mobile",
            "10.5099",
            "10",
            "100",
            "1",
        ]]);
        ingest_records(&pool, set, None).await.expect("ingest");

        let stored: Decimal = sqlx::query_scalar("SELECT spend FROM ad_spend")
            .fetch_one(&pool)
            .await
            .expect("stored spend");
        assert_eq!(stored, Decimal::new(105_099, 4));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn load_failure_rolls_back_the_whole_batch(pool: PgPool) {
        ingest_records(&pool, july_record_set(), None)
            .await
            .expect("seed ingest");
        let before = count_spend_rows(&pool).await.expect("count before");

        // The second row's spend overflows NUMERIC(12,4) at the storage
        // boundary, failing the insert after the first row was staged.
        let set = record_set(vec![
            vec![
                "2025-07-04",
                "google",
                "acct-1",
                "brand",
                "US",
                "mobile",
                "5",
                "10",
                "100",
                "1",
            ],
            vec![
                "2025-07-05",
                "meta",
                "acct-1",
                "brand",
                "US",
                "mobile",
                "999999999999999",
                "10",
                "100",
                "1",
            ],
        ]);

        let err = ingest_records(&pool, set, None)
            .await
            .expect_err("numeric overflow should fail the batch");
        assert!(matches!(err, IngestError::Load(_)));

        let after = count_spend_rows(&pool).await.expect("count after");
        assert_eq!(after, before, "failed batch must leave the store unchanged");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn empty_batch_inserts_nothing(pool: PgPool) {
        let receipt = ingest_records(&pool, record_set(vec![]), None)
            .await
            .expect("ingest");
        assert_eq!(receipt.inserted_rows, 0);
        assert_eq!(receipt.total_rows, 0);
    }
}
