use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{hash_map::Entry, HashMap};

use super::rows::{NormalizedRow, SkipReason};
use crate::schema::{ColumnMap, MeasurementColumn};

/// Identity of one logical plant within a run, used to merge rows before
/// writing. Name comparison is case-insensitive so superficial casing
/// differences collapse into one record; the first row seen supplies the
/// stored spelling. Also the basis of the store's idempotent primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlantKey {
    plant_id: Option<String>,
    name_folded: String,
    state: String,
    balancing_authority: Option<String>,
}

impl PlantKey {
    pub fn for_row(row: &NormalizedRow) -> Self {
        Self {
            plant_id: row.plant_id.clone(),
            name_folded: row.plant_name.to_lowercase(),
            state: row.state.clone(),
            balancing_authority: row.balancing_authority.clone(),
        }
    }
}

/// One plant-level record ready for upsert. `plant_id` is the store's
/// primary key; `plant_name_lc` feeds the substring search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantRecord {
    pub plant_id: String,
    pub plant_name: String,
    pub plant_name_lc: String,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balancing_authority_code: Option<String>,
    pub net_generation_mwh: Decimal,
}

impl PlantRecord {
    fn from_row(row: &NormalizedRow) -> Self {
        Self {
            plant_id: row.derived_plant_id(),
            plant_name: row.plant_name.clone(),
            plant_name_lc: row.plant_name.to_lowercase(),
            state: row.state.clone(),
            balancing_authority_code: row.balancing_authority.clone(),
            net_generation_mwh: row.net_generation,
        }
    }
}

/// Per-reason counts of dropped rows for the run summary.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SkipCounts {
    pub blank: usize,
    pub unreadable: usize,
    pub missing_name: usize,
    pub missing_state: usize,
    pub no_measurement: usize,
    pub negative: usize,
}

impl SkipCounts {
    pub fn record(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::BlankLine => self.blank += 1,
            SkipReason::Unreadable => self.unreadable += 1,
            SkipReason::MissingPlantName => self.missing_name += 1,
            SkipReason::MissingState => self.missing_state += 1,
            SkipReason::NoMeasurement => self.no_measurement += 1,
            SkipReason::NegativeValue => self.negative += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.blank
            + self.unreadable
            + self.missing_name
            + self.missing_state
            + self.no_measurement
            + self.negative
    }
}

/// Everything one file produced: the merged records plus row accounting.
#[derive(Debug, Default)]
pub struct FileAggregate {
    pub records: HashMap<PlantKey, PlantRecord>,
    pub rows_seen: usize,
    pub skips: SkipCounts,
}

/// Merge the row stream for one file into one record per plant key.
///
/// Plant-level files assume one row per plant; a duplicate key keeps the
/// first row's identity fields and takes the later row's value. Generator
/// level files sum values per key, identity fields again from the first row
/// observed, mismatches between later rows deliberately unreconciled.
pub fn aggregate<I>(rows: I, columns: &ColumnMap) -> FileAggregate
where
    I: IntoIterator<Item = Result<NormalizedRow, SkipReason>>,
{
    let generator_level = matches!(columns.measurement, MeasurementColumn::Generator(_));
    let mut out = FileAggregate::default();

    for row in rows {
        out.rows_seen += 1;
        let row = match row {
            Ok(row) => row,
            Err(reason) => {
                out.skips.record(reason);
                continue;
            }
        };

        match out.records.entry(PlantKey::for_row(&row)) {
            Entry::Vacant(entry) => {
                entry.insert(PlantRecord::from_row(&row));
            }
            Entry::Occupied(mut entry) => {
                if generator_level {
                    entry.get_mut().net_generation_mwh += row.net_generation;
                } else {
                    entry.get_mut().net_generation_mwh = row.net_generation;
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::MeasurementColumn;

    fn row(name: &str, state: &str, value: i64) -> Result<NormalizedRow, SkipReason> {
        Ok(NormalizedRow {
            plant_id: None,
            plant_name: name.trim().to_string(),
            state: state.to_uppercase(),
            balancing_authority: None,
            net_generation: Decimal::from(value),
        })
    }

    fn plant_columns() -> ColumnMap {
        ColumnMap {
            plant_id: None,
            plant_name: 0,
            state: 1,
            balancing_authority: None,
            measurement: MeasurementColumn::Plant(2),
        }
    }

    fn generator_columns() -> ColumnMap {
        ColumnMap {
            measurement: MeasurementColumn::Generator(2),
            ..plant_columns()
        }
    }

    #[test]
    fn generator_rows_sum_per_key() {
        let agg = aggregate(
            vec![row("Plant B", "ca", 30), row("Plant B", "ca", 70)],
            &generator_columns(),
        );
        assert_eq!(agg.records.len(), 1);
        let record = agg.records.values().next().unwrap();
        assert_eq!(record.plant_id, "CA:Plant B");
        assert_eq!(record.net_generation_mwh, Decimal::from(100));
    }

    #[test]
    fn plant_rows_overwrite_per_key() {
        let agg = aggregate(
            vec![row("Plant D", "wa", 50), row("Plant D", "wa", 80)],
            &plant_columns(),
        );
        assert_eq!(agg.records.len(), 1);
        let record = agg.records.values().next().unwrap();
        assert_eq!(record.net_generation_mwh, Decimal::from(80));
    }

    #[test]
    fn casing_and_whitespace_collapse_to_one_record() {
        let agg = aggregate(
            vec![row(" Plant C ", "ny", 10), row("plant c", "NY", 15)],
            &generator_columns(),
        );
        assert_eq!(agg.records.len(), 1);
        let record = agg.records.values().next().unwrap();
        // First-seen spelling wins for both the key and the display name.
        assert_eq!(record.plant_id, "NY:Plant C");
        assert_eq!(record.plant_name, "Plant C");
        assert_eq!(record.plant_name_lc, "plant c");
        assert_eq!(record.net_generation_mwh, Decimal::from(25));
    }

    #[test]
    fn distinct_states_stay_distinct() {
        let agg = aggregate(
            vec![row("Plant E", "tx", 1), row("Plant E", "ok", 2)],
            &generator_columns(),
        );
        assert_eq!(agg.records.len(), 2);
    }

    #[test]
    fn explicit_id_beats_derived_key() {
        let rows = vec![
            Ok(NormalizedRow {
                plant_id: Some("117".into()),
                plant_name: "Plant F".into(),
                state: "AZ".into(),
                balancing_authority: Some("AZPS".into()),
                net_generation: Decimal::from(5),
            }),
            Ok(NormalizedRow {
                plant_id: Some("117".into()),
                plant_name: "Plant F".into(),
                state: "AZ".into(),
                balancing_authority: Some("AZPS".into()),
                net_generation: Decimal::from(7),
            }),
        ];
        let agg = aggregate(rows, &generator_columns());
        assert_eq!(agg.records.len(), 1);
        let record = agg.records.values().next().unwrap();
        assert_eq!(record.plant_id, "117");
        assert_eq!(record.net_generation_mwh, Decimal::from(12));
        assert_eq!(record.balancing_authority_code.as_deref(), Some("AZPS"));
    }

    #[test]
    fn skipped_rows_are_counted_but_not_aggregated() {
        let rows = vec![
            row("Plant G", "tx", 40),
            Err(SkipReason::NoMeasurement),
            Err(SkipReason::BlankLine),
        ];
        let agg = aggregate(rows, &generator_columns());
        assert_eq!(agg.records.len(), 1);
        assert_eq!(agg.rows_seen, 3);
        assert_eq!(agg.skips.no_measurement, 1);
        assert_eq!(agg.skips.blank, 1);
        assert_eq!(agg.skips.total(), 2);
    }
}
