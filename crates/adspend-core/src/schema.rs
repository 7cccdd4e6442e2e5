//! Required-column validation for incoming record sets.

use std::collections::HashSet;

use thiserror::Error;

use crate::records::RawRecordSet;

/// Columns every ingest batch must provide, after name normalization.
pub const REQUIRED_COLUMNS: [&str; 10] = [
    "date",
    "platform",
    "account",
    "campaign",
    "country",
    "device",
    "spend",
    "clicks",
    "impressions",
    "conversions",
];

/// The record set is missing one or more required columns.
///
/// Carries the full sorted missing-column list; validation is all-or-nothing
/// and no row is inspected before it passes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("missing required columns: {}", .missing.join(", "))]
pub struct SchemaError {
    pub missing: Vec<String>,
}

/// Validates that a record set carries every required column.
///
/// Column names are trimmed and lower-cased before the check, so
/// `" Spend "` satisfies the `spend` requirement. On success the record set
/// is returned with the normalized column names and untouched row content.
///
/// # Errors
///
/// Returns [`SchemaError`] naming every missing column.
pub fn validate_columns(mut set: RawRecordSet) -> Result<RawRecordSet, SchemaError> {
    for column in &mut set.columns {
        *column = column.trim().to_lowercase();
    }

    let available: HashSet<&str> = set.columns.iter().map(String::as_str).collect();
    let mut missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|required| !available.contains(**required))
        .map(|required| (*required).to_string())
        .collect();

    if missing.is_empty() {
        Ok(set)
    } else {
        missing.sort_unstable();
        Err(SchemaError { missing })
    }
}
