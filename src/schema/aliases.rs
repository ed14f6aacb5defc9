use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs::File, path::Path};

use super::CanonicalField;

/// Accepted raw header spellings per canonical field, in priority order.
/// Immutable once constructed; the resolver never mutates it at runtime.
/// The built-in table covers the eGRID and EIA-923 style exports we see in
/// practice, and a deployment can override it with a YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AliasTable {
    fields: HashMap<CanonicalField, Vec<String>>,
}

impl AliasTable {
    /// Load an override table from YAML, shaped as
    /// `canonical_field: [alias, ...]`.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("opening alias file {}", path.display()))?;
        let table: AliasTable = serde_yaml::from_reader(file)
            .with_context(|| format!("parsing alias file {}", path.display()))?;
        Ok(table)
    }

    /// Aliases for `field` in priority order; empty when the table does not
    /// cover the field at all.
    pub fn aliases_for(&self, field: CanonicalField) -> &[String] {
        self.fields.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl Default for AliasTable {
    fn default() -> Self {
        fn owned(aliases: &[&str]) -> Vec<String> {
            aliases.iter().map(|a| a.to_string()).collect()
        }

        let fields = HashMap::from([
            (
                CanonicalField::PlantId,
                owned(&[
                    "plant id (orispl)",
                    "orispl",
                    "plant code",
                    "plant orispl code",
                ]),
            ),
            (CanonicalField::PlantName, owned(&["plant name"])),
            (
                CanonicalField::State,
                owned(&["state abbreviation", "plant state abbreviation", "state"]),
            ),
            (
                CanonicalField::NetGeneration,
                owned(&[
                    "plant annual net generation (mwh)",
                    "plant annual net generation",
                    "net generation (mwh)",
                    "generation (mwh)",
                    "annual net generation (mwh)",
                ]),
            ),
            (
                CanonicalField::BalancingAuthority,
                owned(&[
                    "balancing authority code",
                    "ba code",
                    "egrid subregion code",
                ]),
            ),
            (
                CanonicalField::GeneratorNetGeneration,
                owned(&[
                    "generator annual net generation (mwh)",
                    "annual net generation (mwh) - generator",
                    "generator net generation (mwh)",
                ]),
            ),
        ]);

        Self { fields }
    }
}
