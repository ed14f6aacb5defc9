// src/process/mod.rs

pub mod aggregate;
pub mod decode;
pub mod rows;
pub mod sniff;

pub use aggregate::{aggregate, FileAggregate, PlantKey, PlantRecord, SkipCounts};
pub use decode::decode_text;
pub use rows::{normalize_row, parse_decimal, NormalizedRow, RawRow, SkipReason};
pub use sniff::sniff_delimiter;

use csv::ReaderBuilder;
use tracing::debug;

use crate::error::SchemaError;
use crate::schema::AliasTable;

/// Run the full per-file pipeline over decoded text: sniff the dialect,
/// resolve the header against the alias table, normalize each content line,
/// and merge rows into one record per plant key.
///
/// An empty file yields an empty aggregate. A header that cannot be
/// resolved rejects the whole file via `SchemaError`; every defect below
/// the header only drops the affected row.
pub fn process_text(text: &str, aliases: &AliasTable) -> Result<FileAggregate, SchemaError> {
    let delimiter = sniff_delimiter(text);
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = reader.records();
    let header: Vec<String> = match records.next() {
        Some(Ok(record)) => record.iter().map(str::to_string).collect(),
        Some(Err(_)) | None => return Ok(FileAggregate::default()),
    };

    let columns = aliases.resolve_columns(&header)?;
    debug!(
        delimiter = %(delimiter as char),
        generator_level = matches!(
            columns.measurement,
            crate::schema::MeasurementColumn::Generator(_)
        ),
        "resolved columns"
    );

    let normalized = records.map(|record| match record {
        Ok(record) => normalize_row(&RawRow::from(record), &columns),
        Err(_) => Err(SkipReason::Unreadable),
    });

    Ok(aggregate(normalized, &columns))
}
