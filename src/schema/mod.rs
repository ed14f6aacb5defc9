// src/schema/mod.rs

pub mod aliases;

pub use aliases::AliasTable;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// The fixed semantic columns the pipeline understands. Everything else in
/// an input file is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    PlantId,
    PlantName,
    State,
    NetGeneration,
    BalancingAuthority,
    GeneratorNetGeneration,
}

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Lower-case a header cell and collapse every non-alphanumeric run to a
/// single space, so "Plant Name", "PLANT_NAME" and "plant-name" all compare
/// equal.
pub fn normalize_header(raw: &str) -> String {
    NON_ALNUM
        .replace_all(&raw.trim().to_lowercase(), " ")
        .trim()
        .to_string()
}

/// How a header matched an alias. Exact outranks containment when two
/// canonical fields land on the same column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum MatchStrength {
    Contains,
    Exact,
}

/// Which measurement column a file exposes. Plant-level files carry one row
/// per plant; generator-level files need summation per plant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasurementColumn {
    Plant(usize),
    Generator(usize),
}

impl MeasurementColumn {
    pub fn index(&self) -> usize {
        match *self {
            MeasurementColumn::Plant(idx) | MeasurementColumn::Generator(idx) => idx,
        }
    }
}

/// Column indices resolved from one file's header row.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    pub plant_id: Option<usize>,
    pub plant_name: usize,
    pub state: usize,
    pub balancing_authority: Option<usize>,
    pub measurement: MeasurementColumn,
}

impl AliasTable {
    /// Column index for `field` in `headers`, or None.
    ///
    /// Pass 1 is an exact match on normalized text, walking aliases in
    /// priority order and taking the first matching header index. Pass 2
    /// relaxes to substring containment in either direction, same ordering.
    pub fn find_column(&self, headers: &[String], field: CanonicalField) -> Option<usize> {
        self.find_column_ranked(headers, field).map(|(idx, _)| idx)
    }

    fn find_column_ranked(
        &self,
        headers: &[String],
        field: CanonicalField,
    ) -> Option<(usize, MatchStrength)> {
        let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();

        for alias in self.aliases_for(field) {
            let alias = normalize_header(alias);
            for (idx, header) in normalized.iter().enumerate() {
                if *header == alias {
                    return Some((idx, MatchStrength::Exact));
                }
            }
        }

        for alias in self.aliases_for(field) {
            let alias = normalize_header(alias);
            for (idx, header) in normalized.iter().enumerate() {
                // An empty header cell would be contained in every alias.
                if header.is_empty() {
                    continue;
                }
                if header.contains(&alias) || alias.contains(header.as_str()) {
                    return Some((idx, MatchStrength::Contains));
                }
            }
        }

        None
    }

    /// Resolve the full column map for a header row. Plant name and state
    /// are mandatory; at least one measurement column must resolve or the
    /// file is rejected whole.
    ///
    /// When the plant-level and generator-level alias sets resolve to
    /// distinct columns the plant-level one wins. When they land on the same
    /// column (the loose containment pass makes that common for headers like
    /// "Generator Annual Net Generation (MWh)"), the stronger match decides
    /// what the column really is, ties going to plant-level.
    pub fn resolve_columns(&self, headers: &[String]) -> Result<ColumnMap, SchemaError> {
        let plant_name = self.find_column(headers, CanonicalField::PlantName);
        let state = self.find_column(headers, CanonicalField::State);
        let net = self.find_column_ranked(headers, CanonicalField::NetGeneration);
        let generator_net =
            self.find_column_ranked(headers, CanonicalField::GeneratorNetGeneration);

        let measurement = match (net, generator_net) {
            (Some((n, _)), Some((g, _))) if n != g => Some(MeasurementColumn::Plant(n)),
            (Some((n, n_strength)), Some((g, g_strength))) => {
                if g_strength > n_strength {
                    Some(MeasurementColumn::Generator(g))
                } else {
                    Some(MeasurementColumn::Plant(n))
                }
            }
            (Some((n, _)), None) => Some(MeasurementColumn::Plant(n)),
            (None, Some((g, _))) => Some(MeasurementColumn::Generator(g)),
            (None, None) => None,
        };

        match (plant_name, state, measurement) {
            (Some(plant_name), Some(state), Some(measurement)) => Ok(ColumnMap {
                plant_id: self.find_column(headers, CanonicalField::PlantId),
                plant_name,
                state,
                balancing_authority: self.find_column(headers, CanonicalField::BalancingAuthority),
                measurement,
            }),
            _ => {
                let mut missing = Vec::new();
                if plant_name.is_none() {
                    missing.push("plant name");
                }
                if state.is_none() {
                    missing.push("state");
                }
                if measurement.is_none() {
                    missing.push("net generation (plant or generator level)");
                }
                Err(SchemaError::Unrecognized {
                    missing: missing.join(", "),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn normalization_collapses_punctuation_and_case() {
        assert_eq!(normalize_header("  Plant Name "), "plant name");
        assert_eq!(normalize_header("PLANT__NAME"), "plant name");
        assert_eq!(normalize_header("Plant-Name (2023)"), "plant name 2023");
        assert_eq!(normalize_header("...!!!"), "");
    }

    #[test]
    fn every_alias_resolves_to_its_column() {
        let table = AliasTable::default();
        for field in [
            CanonicalField::PlantId,
            CanonicalField::PlantName,
            CanonicalField::State,
            CanonicalField::NetGeneration,
            CanonicalField::BalancingAuthority,
            CanonicalField::GeneratorNetGeneration,
        ] {
            for alias in table.aliases_for(field) {
                // Surround with unrelated headers and scramble the casing.
                let row = headers(&["zzz first", &alias.to_uppercase(), "zzz last"]);
                assert_eq!(
                    table.find_column(&row, field),
                    Some(1),
                    "alias {alias:?} of {field:?} did not resolve"
                );
            }
        }
    }

    #[test]
    fn exact_match_beats_containment() {
        let table = AliasTable::default();
        // "state" matches index 1 exactly; index 0 only by containment.
        let row = headers(&["interstate region", "State"]);
        assert_eq!(table.find_column(&row, CanonicalField::State), Some(1));
    }

    #[test]
    fn containment_matches_either_direction() {
        let table = AliasTable::default();
        // Header text contains the alias.
        let row = headers(&["2023 Plant Name Reported"]);
        assert_eq!(table.find_column(&row, CanonicalField::PlantName), Some(0));
        // Alias contains the header text.
        let row = headers(&["Net Generation"]);
        assert_eq!(
            table.find_column(&row, CanonicalField::NetGeneration),
            Some(0)
        );
    }

    #[test]
    fn unrelated_headers_resolve_to_not_found() {
        let table = AliasTable::default();
        let row = headers(&["fuel type", "county", "operator"]);
        assert_eq!(table.find_column(&row, CanonicalField::PlantName), None);
        assert!(table.resolve_columns(&row).is_err());
    }

    #[test]
    fn empty_header_cells_never_match() {
        let table = AliasTable::default();
        let row = headers(&["", "   ", "Plant Name"]);
        assert_eq!(table.find_column(&row, CanonicalField::PlantName), Some(2));
        assert_eq!(table.find_column(&row, CanonicalField::State), None);
    }

    #[test]
    fn plant_level_measurement_wins_over_generator_level() {
        let table = AliasTable::default();
        let row = headers(&[
            "Plant Name",
            "State",
            "Generator Annual Net Generation (MWh)",
            "Plant Annual Net Generation (MWh)",
        ]);
        let columns = table.resolve_columns(&row).unwrap();
        assert_eq!(columns.measurement, MeasurementColumn::Plant(3));
    }

    #[test]
    fn generator_only_header_selects_generator_mode() {
        // The plant-level alias "net generation (mwh)" containment-matches
        // this header too; the exact generator-level match must win.
        let table = AliasTable::default();
        let row = headers(&[
            "Plant Name",
            "State Abbreviation",
            "Generator Annual Net Generation (MWh)",
        ]);
        let columns = table.resolve_columns(&row).unwrap();
        assert_eq!(columns.measurement, MeasurementColumn::Generator(2));
        assert_eq!(columns.plant_id, None);
    }

    #[test]
    fn plant_only_header_stays_plant_mode() {
        // The generator alias set containment-matches "Net Generation (MWh)"
        // as well, but only the plant-level set matches it exactly.
        let table = AliasTable::default();
        let row = headers(&["Plant Name", "State", "Net Generation (MWh)"]);
        let columns = table.resolve_columns(&row).unwrap();
        assert_eq!(columns.measurement, MeasurementColumn::Plant(2));
    }

    #[test]
    fn missing_measurement_rejects_the_file() {
        let table = AliasTable::default();
        let row = headers(&["Plant Name", "State"]);
        let err = table.resolve_columns(&row).unwrap_err();
        assert!(err.to_string().contains("net generation"));
    }
}
