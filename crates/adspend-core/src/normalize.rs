//! Lenient type coercion from a validated record set to [`SpendRecord`]s.
//!
//! The cast-to-null policy is deliberate spreadsheet-import tolerance: a
//! field that does not parse weakens to `None`, it never rejects the row.
//! Schema validation in [`crate::schema`] is the only gate that fails a
//! batch outright.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::records::{NormalizedBatch, NullCounts, RawRecordSet, SpendRecord};

/// Provenance stamped on a batch when the caller supplies no identifier.
pub const FALLBACK_SOURCE_FILE_NAME: &str = "unknown.csv";

/// Date layouts accepted from spreadsheet exports, tried in order.
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Positional indexes of the required columns in a validated record set.
struct ColumnIndexes {
    date: Option<usize>,
    platform: Option<usize>,
    account: Option<usize>,
    campaign: Option<usize>,
    country: Option<usize>,
    device: Option<usize>,
    spend: Option<usize>,
    clicks: Option<usize>,
    impressions: Option<usize>,
    conversions: Option<usize>,
}

impl ColumnIndexes {
    fn resolve(set: &RawRecordSet) -> Self {
        Self {
            date: set.column_index("date"),
            platform: set.column_index("platform"),
            account: set.column_index("account"),
            campaign: set.column_index("campaign"),
            country: set.column_index("country"),
            device: set.column_index("device"),
            spend: set.column_index("spend"),
            clicks: set.column_index("clicks"),
            impressions: set.column_index("impressions"),
            conversions: set.column_index("conversions"),
        }
    }
}

/// Coerces a validated record set into typed [`SpendRecord`]s.
///
/// Every output record carries the same `load_date` (one `Utc::now()` sample
/// per call, not per row) and `source_file_name`. The output record count
/// always equals the input row count: individual fields that fail to parse
/// become `None` and are tallied in the returned
/// [`NullCounts`](crate::records::NullCounts), but the row survives.
#[must_use]
pub fn normalize_records(set: &RawRecordSet, source_file_name: Option<&str>) -> NormalizedBatch {
    let load_date = Utc::now();
    let source_file_name = source_file_name.unwrap_or(FALLBACK_SOURCE_FILE_NAME);
    let idx = ColumnIndexes::resolve(set);
    let mut null_counts = NullCounts::default();

    let records = set
        .rows
        .iter()
        .map(|row| SpendRecord {
            date: coerce(cell(row, idx.date), parse_date, &mut null_counts.date),
            platform: text_value(cell(row, idx.platform)),
            account: text_value(cell(row, idx.account)),
            campaign: text_value(cell(row, idx.campaign)),
            country: text_value(cell(row, idx.country)),
            device: text_value(cell(row, idx.device)),
            spend: coerce(cell(row, idx.spend), parse_spend, &mut null_counts.spend),
            clicks: coerce(cell(row, idx.clicks), parse_count, &mut null_counts.clicks),
            impressions: coerce(
                cell(row, idx.impressions),
                parse_count,
                &mut null_counts.impressions,
            ),
            conversions: coerce(
                cell(row, idx.conversions),
                parse_count,
                &mut null_counts.conversions,
            ),
            load_date,
            source_file_name: source_file_name.to_string(),
        })
        .collect();

    NormalizedBatch {
        records,
        load_date,
        null_counts,
    }
}

fn cell<'a>(row: &'a [String], index: Option<usize>) -> Option<&'a str> {
    index.and_then(|i| row.get(i)).map(String::as_str)
}

/// Runs a parser over a trimmed non-empty cell, counting coercion failures.
///
/// Empty or missing cells are `None` without counting — only a value that
/// was present but did not survive parsing is a coercion failure.
fn coerce<T>(
    raw: Option<&str>,
    parse: impl Fn(&str) -> Option<T>,
    failures: &mut u64,
) -> Option<T> {
    let trimmed = raw.unwrap_or("").trim();
    if trimmed.is_empty() {
        return None;
    }
    let parsed = parse(trimmed);
    if parsed.is_none() {
        *failures += 1;
    }
    parsed
}

fn text_value(raw: Option<&str>) -> Option<String> {
    raw.filter(|s| !s.is_empty()).map(ToString::to_string)
}

fn parse_date(trimmed: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
}

fn parse_spend(trimmed: &str) -> Option<Decimal> {
    trimmed
        .parse::<Decimal>()
        .ok()
        .filter(|amount| !amount.is_sign_negative())
}

/// Parses a non-negative integer count.
///
/// Spreadsheet exports often render counts as `"3.0"`; a value with an
/// all-zero fraction is accepted as its integer part.
fn parse_count(trimmed: &str) -> Option<i64> {
    let value = match trimmed.parse::<i64>() {
        Ok(v) => v,
        Err(_) => {
            let (int_part, frac_part) = trimmed.split_once('.')?;
            if !frac_part.bytes().all(|b| b == b'0') {
                return None;
            }
            int_part.parse::<i64>().ok()?
        }
    };
    (value >= 0).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_set(rows: Vec<Vec<&str>>) -> RawRecordSet {
        RawRecordSet {
            columns: crate::schema::REQUIRED_COLUMNS
                .iter()
                .map(|c| (*c).to_string())
                .collect(),
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(ToString::to_string).collect())
                .collect(),
        }
    }

    fn full_row() -> Vec<&'static str> {
        vec![
            "2025-07-01",
            "google",
            "acct-1",
            "brand",
            "US",
            "mobile",
            "10.50",
            "42",
            "1000",
            "3",
        ]
    }

    #[test]
    fn valid_row_parses_every_field() {
        let batch = normalize_records(&make_set(vec![full_row()]), Some("ads.csv"));
        let record = &batch.records[0];
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2025, 7, 1));
        assert_eq!(record.platform.as_deref(), Some("google"));
        assert_eq!(record.spend, Some(Decimal::new(1050, 2)));
        assert_eq!(record.clicks, Some(42));
        assert_eq!(record.impressions, Some(1000));
        assert_eq!(record.conversions, Some(3));
        assert_eq!(record.source_file_name, "ads.csv");
        assert_eq!(batch.null_counts.total(), 0);
    }

    #[test]
    fn output_row_count_equals_input_row_count() {
        let mut bad_row = full_row();
        bad_row[0] = "not-a-date";
        bad_row[6] = "not-a-number";
        let batch = normalize_records(&make_set(vec![full_row(), bad_row, full_row()]), None);
        assert_eq!(batch.records.len(), 3);
    }

    #[test]
    fn unparsable_date_becomes_null_and_is_counted() {
        let mut row = full_row();
        row[0] = "July 1st";
        let batch = normalize_records(&make_set(vec![row]), None);
        assert_eq!(batch.records[0].date, None);
        assert_eq!(batch.null_counts.date, 1);
    }

    #[test]
    fn slash_date_formats_are_accepted() {
        let mut ymd = full_row();
        ymd[0] = "2025/07/02";
        let mut mdy = full_row();
        mdy[0] = "07/03/2025";
        let batch = normalize_records(&make_set(vec![ymd, mdy]), None);
        assert_eq!(batch.records[0].date, NaiveDate::from_ymd_opt(2025, 7, 2));
        assert_eq!(batch.records[1].date, NaiveDate::from_ymd_opt(2025, 7, 3));
    }

    #[test]
    fn negative_spend_is_weakened_to_null() {
        let mut row = full_row();
        row[6] = "-5.00";
        let batch = normalize_records(&make_set(vec![row]), None);
        assert_eq!(batch.records[0].spend, None);
        assert_eq!(batch.null_counts.spend, 1);
    }

    #[test]
    fn negative_count_is_weakened_to_null() {
        let mut row = full_row();
        row[9] = "-1";
        let batch = normalize_records(&make_set(vec![row]), None);
        assert_eq!(batch.records[0].conversions, None);
        assert_eq!(batch.null_counts.conversions, 1);
    }

    #[test]
    fn float_shaped_count_with_zero_fraction_is_accepted() {
        let mut row = full_row();
        row[7] = "42.0";
        row[8] = "17.5";
        let batch = normalize_records(&make_set(vec![row]), None);
        assert_eq!(batch.records[0].clicks, Some(42));
        assert_eq!(batch.records[0].impressions, None);
        assert_eq!(batch.null_counts.clicks, 0);
        assert_eq!(batch.null_counts.impressions, 1);
    }

    #[test]
    fn empty_cells_become_null_without_counting() {
        let mut row = full_row();
        row[1] = "";
        row[6] = "";
        row[9] = "  ";
        let batch = normalize_records(&make_set(vec![row]), None);
        assert_eq!(batch.records[0].platform, None);
        assert_eq!(batch.records[0].spend, None);
        assert_eq!(batch.records[0].conversions, None);
        assert_eq!(batch.null_counts.total(), 0);
    }

    #[test]
    fn ragged_row_reads_missing_cells_as_null() {
        let short_row = vec!["2025-07-01", "google"];
        let batch = normalize_records(&make_set(vec![short_row]), None);
        let record = &batch.records[0];
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2025, 7, 1));
        assert_eq!(record.platform.as_deref(), Some("google"));
        assert_eq!(record.spend, None);
        assert_eq!(record.conversions, None);
        assert_eq!(batch.null_counts.total(), 0);
    }

    #[test]
    fn load_date_is_sampled_once_for_the_batch() {
        let batch = normalize_records(&make_set(vec![full_row(), full_row()]), None);
        assert_eq!(batch.records[0].load_date, batch.load_date);
        assert_eq!(batch.records[1].load_date, batch.load_date);
    }

    #[test]
    fn missing_source_file_name_uses_fallback() {
        let batch = normalize_records(&make_set(vec![full_row()]), None);
        assert_eq!(
            batch.records[0].source_file_name,
            FALLBACK_SOURCE_FILE_NAME
        );
    }

    #[test]
    fn numeric_cells_are_trimmed_before_parsing() {
        let mut row = full_row();
        row[6] = " 10.50 ";
        row[7] = " 42 ";
        let batch = normalize_records(&make_set(vec![row]), None);
        assert_eq!(batch.records[0].spend, Some(Decimal::new(1050, 2)));
        assert_eq!(batch.records[0].clicks, Some(42));
    }
}
