use async_trait::async_trait;
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use std::{
    path::Path,
    str::FromStr,
    sync::Mutex,
};
use tracing::warn;

use crate::error::StoreError;
use crate::process::PlantRecord;

/// How many rows one scan page fetches before asking for the next.
const SCAN_PAGE: usize = 100;

/// Per-item result of a batch upsert. Failures are reported, never thrown,
/// so one bad item cannot abort the rest of its batch.
#[derive(Debug)]
pub enum PutOutcome {
    Written,
    Failed { plant_id: String, reason: String },
}

/// The key-value record store as the pipeline consumes it: one item per
/// plant, keyed by `plant_id`, upserts replacing the whole item.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create the table if it does not already exist.
    async fn ensure_table(&self) -> Result<(), StoreError>;

    /// Upsert each record with overwrite-by-key semantics. Outcomes come
    /// back in input order.
    async fn put_batch(&self, records: &[PlantRecord]) -> Result<Vec<PutOutcome>, StoreError>;

    /// Full scan, optionally filtered to one state. The implementation
    /// drains its own pagination, so callers always see the complete
    /// result.
    async fn scan(&self, state: Option<&str>) -> Result<Vec<PlantRecord>, StoreError>;
}

/// SQLite-backed record store. One table, `plant_id` as primary key and a
/// secondary index on the lower-cased name for substring search.
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
    table: String,
}

impl SqliteRecordStore {
    pub fn open(path: impl AsRef<Path>, table: &str) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self {
            conn: Mutex::new(Connection::open(path)?),
            table: checked_table_name(table)?,
        })
    }

    pub fn open_in_memory(table: &str) -> Result<Self, StoreError> {
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory()?),
            table: checked_table_name(table)?,
        })
    }
}

/// Table names are configuration, not user input, but they are still spliced
/// into SQL; restrict them to identifier characters.
fn checked_table_name(table: &str) -> Result<String, StoreError> {
    if !table.is_empty()
        && table
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        Ok(table.to_string())
    } else {
        Err(StoreError::Backend(format!(
            "invalid table name: {table:?}"
        )))
    }
}

fn record_from_sql_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(PlantRecord, String)> {
    let raw_net: String = row.get(5)?;
    Ok((
        PlantRecord {
            plant_id: row.get(0)?,
            plant_name: row.get(1)?,
            plant_name_lc: row.get(2)?,
            state: row.get(3)?,
            balancing_authority_code: row.get(4)?,
            net_generation_mwh: Decimal::ZERO,
        },
        raw_net,
    ))
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn ensure_table(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                plant_id TEXT PRIMARY KEY,
                plant_name TEXT NOT NULL,
                plant_name_lc TEXT NOT NULL,
                state TEXT NOT NULL,
                balancing_authority_code TEXT,
                net_generation_mwh TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_{table}_name_lc
                ON {table} (plant_name_lc);",
            table = self.table
        ))?;
        Ok(())
    }

    async fn put_batch(&self, records: &[PlantRecord]) -> Result<Vec<PutOutcome>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "INSERT OR REPLACE INTO {} (
                plant_id, plant_name, plant_name_lc, state,
                balancing_authority_code, net_generation_mwh
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            self.table
        );
        let mut stmt = conn.prepare(&sql)?;

        let mut outcomes = Vec::with_capacity(records.len());
        for record in records {
            let result = stmt.execute(params![
                record.plant_id,
                record.plant_name,
                record.plant_name_lc,
                record.state,
                record.balancing_authority_code,
                record.net_generation_mwh.to_string(),
            ]);
            outcomes.push(match result {
                Ok(_) => PutOutcome::Written,
                Err(e) => PutOutcome::Failed {
                    plant_id: record.plant_id.clone(),
                    reason: e.to_string(),
                },
            });
        }
        Ok(outcomes)
    }

    async fn scan(&self, state: Option<&str>) -> Result<Vec<PlantRecord>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let base = format!(
            "SELECT plant_id, plant_name, plant_name_lc, state,
                    balancing_authority_code, net_generation_mwh
             FROM {} {} ORDER BY plant_id LIMIT ?1 OFFSET ?2",
            self.table,
            if state.is_some() {
                "WHERE state = ?3"
            } else {
                ""
            }
        );
        let mut stmt = conn.prepare(&base)?;

        let mut items = Vec::new();
        let mut offset = 0usize;
        loop {
            let mut page = Vec::new();
            let mut push_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<()> {
                page.push(record_from_sql_row(row)?);
                Ok(())
            };
            match state {
                Some(state) => {
                    let mut rows = stmt.query(params![SCAN_PAGE as i64, offset as i64, state])?;
                    while let Some(row) = rows.next()? {
                        push_row(row)?;
                    }
                }
                None => {
                    let mut rows = stmt.query(params![SCAN_PAGE as i64, offset as i64])?;
                    while let Some(row) = rows.next()? {
                        push_row(row)?;
                    }
                }
            }

            let page_len = page.len();
            for (mut record, raw_net) in page {
                match Decimal::from_str(&raw_net) {
                    Ok(net) => {
                        record.net_generation_mwh = net;
                        items.push(record);
                    }
                    Err(_) => {
                        warn!(plant_id = %record.plant_id, value = %raw_net,
                            "stored measurement is not a decimal, row skipped");
                    }
                }
            }

            if page_len < SCAN_PAGE {
                break;
            }
            offset += page_len;
        }
        Ok(items)
    }
}
