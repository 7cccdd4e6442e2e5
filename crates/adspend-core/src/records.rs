use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A decoded but untyped record set: ordered column names plus rows of
/// string cells, as produced by the CSV decoder.
///
/// Rows may be ragged; consumers treat a missing cell as an absent value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecordSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawRecordSet {
    /// Returns the number of data rows in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the positional index of a column by exact name.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// One row of the `ad_spend` store.
///
/// Every measure is optional: the normalizer coerces unparsable (or, for
/// measures, negative) input to `None` instead of rejecting the row, so a
/// stored record is weakened rather than dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendRecord {
    /// Business date of the spend. `None` when the source value did not
    /// parse as a calendar date.
    pub date: Option<NaiveDate>,
    pub platform: Option<String>,
    pub account: Option<String>,
    pub campaign: Option<String>,
    pub country: Option<String>,
    pub device: Option<String>,
    /// Spend amount; non-negative when present.
    pub spend: Option<Decimal>,
    pub clicks: Option<i64>,
    pub impressions: Option<i64>,
    pub conversions: Option<i64>,
    /// Ingest timestamp, sampled once per batch.
    pub load_date: DateTime<Utc>,
    /// Provenance identifier of the ingest batch.
    pub source_file_name: String,
}

/// Per-field counts of values that were nulled during normalization.
///
/// Only coercion failures are counted — a cell that was present but did not
/// parse (or carried a negative measure). Cells that were empty or missing
/// to begin with are not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NullCounts {
    pub date: u64,
    pub spend: u64,
    pub clicks: u64,
    pub impressions: u64,
    pub conversions: u64,
}

impl NullCounts {
    /// Total nulled values across all fields in the batch.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.date + self.spend + self.clicks + self.impressions + self.conversions
    }
}

/// Output of the normalizer: the typed records of one ingest batch.
///
/// `records.len()` always equals the input row count, and every record
/// carries the same `load_date` and `source_file_name`.
#[derive(Debug, Clone)]
pub struct NormalizedBatch {
    pub records: Vec<SpendRecord>,
    pub load_date: DateTime<Utc>,
    pub null_counts: NullCounts,
}
