//! CSV decoding into the core's untyped record set.

use adspend_core::RawRecordSet;

use crate::error::FetchError;

/// Decodes CSV bytes into a [`RawRecordSet`].
///
/// The first row is read as the header. The reader runs in flexible mode so
/// short rows survive decoding; downstream normalization reads their missing
/// cells as absent values instead of dropping the row.
///
/// # Errors
///
/// Returns [`FetchError::Decode`] if the input is not parseable CSV (e.g.
/// malformed quoting or invalid UTF-8).
pub fn decode_csv(data: &[u8]) -> Result<RawRecordSet, FetchError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(data);

    let columns = reader
        .headers()?
        .iter()
        .map(ToString::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(ToString::to_string).collect());
    }

    Ok(RawRecordSet { columns, rows })
}
