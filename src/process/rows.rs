use csv::StringRecord;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::schema::ColumnMap;

/// One content line of the input file as raw text cells. Row lengths vary
/// between lines, so every access goes through `cell`, which yields None for
/// out-of-range indices instead of panicking.
#[derive(Debug, Clone)]
pub struct RawRow(StringRecord);

impl RawRow {
    pub fn cell(&self, idx: usize) -> Option<&str> {
        self.0.get(idx)
    }

    pub fn is_blank(&self) -> bool {
        self.0.iter().all(|cell| cell.trim().is_empty())
    }
}

impl From<StringRecord> for RawRow {
    fn from(record: StringRecord) -> Self {
        Self(record)
    }
}

/// A row that survived extraction: required fields present and the
/// measurement parsed to a non-negative decimal.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub plant_id: Option<String>,
    /// Trimmed, original casing preserved.
    pub plant_name: String,
    /// Trimmed and upper-cased.
    pub state: String,
    pub balancing_authority: Option<String>,
    pub net_generation: Decimal,
}

impl NormalizedRow {
    /// Store primary key for this row: the explicit identifier when the
    /// file carries one, otherwise `STATE:Name` from this row's trimmed
    /// spelling. Deterministic, so reprocessing a file derives the same
    /// keys and upserts stay idempotent.
    pub fn derived_plant_id(&self) -> String {
        match &self.plant_id {
            Some(id) => id.clone(),
            None => format!("{}:{}", self.state, self.plant_name),
        }
    }
}

/// Why a row was excluded from aggregation. Row defects drop the row and
/// never abort the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Every cell empty or whitespace.
    BlankLine,
    /// The parser could not produce cells for the line at all.
    Unreadable,
    /// Name cell missing, out of range, or empty after trimming.
    MissingPlantName,
    /// State cell missing, out of range, or shorter than two letters.
    MissingState,
    /// Measurement cell missing, blank, or not a finite number.
    NoMeasurement,
    /// Measurement parsed but was negative; totals never go below zero.
    NegativeValue,
}

/// Extract a `NormalizedRow` through the resolved column indices, or report
/// why the row is dropped.
pub fn normalize_row(row: &RawRow, columns: &ColumnMap) -> Result<NormalizedRow, SkipReason> {
    if row.is_blank() {
        return Err(SkipReason::BlankLine);
    }

    let plant_name = row
        .cell(columns.plant_name)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or(SkipReason::MissingPlantName)?
        .to_string();

    let state = row
        .cell(columns.state)
        .map(str::trim)
        .filter(|state| state.len() >= 2)
        .map(str::to_uppercase)
        .ok_or(SkipReason::MissingState)?;

    let net_generation = row
        .cell(columns.measurement.index())
        .and_then(parse_decimal)
        .ok_or(SkipReason::NoMeasurement)?;
    if net_generation < Decimal::ZERO {
        return Err(SkipReason::NegativeValue);
    }

    let plant_id = columns
        .plant_id
        .and_then(|idx| row.cell(idx))
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string);

    let balancing_authority = columns
        .balancing_authority
        .and_then(|idx| row.cell(idx))
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_string);

    Ok(NormalizedRow {
        plant_id,
        plant_name,
        state,
        balancing_authority,
        net_generation,
    })
}

/// Parse a cell as a decimal quantity. Thousands separators are stripped
/// first; plain and scientific notation both parse. Blank or non-numeric
/// cells yield None so the caller drops the row instead of defaulting the
/// value to zero.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let cleaned = raw.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnMap, MeasurementColumn};
    use rust_decimal::Decimal;

    fn raw(cells: &[&str]) -> RawRow {
        RawRow::from(StringRecord::from(cells.to_vec()))
    }

    fn columns() -> ColumnMap {
        ColumnMap {
            plant_id: Some(0),
            plant_name: 1,
            state: 2,
            balancing_authority: Some(3),
            measurement: MeasurementColumn::Plant(4),
        }
    }

    #[test]
    fn parses_thousands_separators_and_scientific_notation() {
        assert_eq!(parse_decimal("1,234.5"), Some(Decimal::new(12345, 1)));
        assert_eq!(parse_decimal("  42 "), Some(Decimal::from(42)));
        assert_eq!(parse_decimal("1e3"), Some(Decimal::from(1000)));
        assert_eq!(parse_decimal("-5"), Some(Decimal::from(-5)));
    }

    #[test]
    fn rejects_blank_and_non_numeric() {
        assert_eq!(parse_decimal(""), None);
        assert_eq!(parse_decimal("   "), None);
        assert_eq!(parse_decimal("n/a"), None);
        assert_eq!(parse_decimal("inf"), None);
        assert_eq!(parse_decimal("nan"), None);
    }

    #[test]
    fn normalizes_a_complete_row() {
        let row = raw(&["3", " Comanche Peak ", "tx", "ERCO", "9,500.5"]);
        let normalized = normalize_row(&row, &columns()).unwrap();
        assert_eq!(normalized.plant_id.as_deref(), Some("3"));
        assert_eq!(normalized.plant_name, "Comanche Peak");
        assert_eq!(normalized.state, "TX");
        assert_eq!(normalized.balancing_authority.as_deref(), Some("ERCO"));
        assert_eq!(normalized.net_generation, Decimal::new(95005, 1));
    }

    #[test]
    fn short_rows_drop_instead_of_panicking() {
        let row = raw(&["3", "Plant A"]);
        assert_eq!(
            normalize_row(&row, &columns()),
            Err(SkipReason::MissingState)
        );
    }

    #[test]
    fn blank_rows_are_reported_as_blank() {
        let row = raw(&["", "  ", "", "", ""]);
        assert_eq!(normalize_row(&row, &columns()), Err(SkipReason::BlankLine));
    }

    #[test]
    fn missing_name_and_state_are_distinguished() {
        let row = raw(&["3", "   ", "TX", "", "100"]);
        assert_eq!(
            normalize_row(&row, &columns()),
            Err(SkipReason::MissingPlantName)
        );
        let row = raw(&["3", "Plant A", "T", "", "100"]);
        assert_eq!(
            normalize_row(&row, &columns()),
            Err(SkipReason::MissingState)
        );
    }

    #[test]
    fn unparseable_measurement_drops_the_row() {
        let row = raw(&["3", "Plant A", "TX", "", "pending"]);
        assert_eq!(
            normalize_row(&row, &columns()),
            Err(SkipReason::NoMeasurement)
        );
    }

    #[test]
    fn negative_measurement_drops_the_row() {
        let row = raw(&["3", "Plant A", "TX", "", "-12.5"]);
        assert_eq!(
            normalize_row(&row, &columns()),
            Err(SkipReason::NegativeValue)
        );
    }

    #[test]
    fn empty_id_cell_falls_back_to_derived_key() {
        let row = raw(&["  ", "Plant A", "TX", "", "100"]);
        let normalized = normalize_row(&row, &columns()).unwrap();
        assert_eq!(normalized.plant_id, None);
        assert_eq!(normalized.derived_plant_id(), "TX:Plant A");
    }
}
