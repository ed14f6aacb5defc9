use std::collections::HashMap;
use tracing::warn;

use super::records::{PutOutcome, RecordStore};
use crate::error::StoreError;
use crate::process::{PlantKey, PlantRecord};

/// Upserts per request batch, sized like the usual key-value store limit.
const BATCH_SIZE: usize = 25;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriteSummary {
    pub written: usize,
    pub failed: usize,
}

/// Write one run's aggregate to the record store. Every upsert replaces the
/// whole stored item, which is what makes reprocessing a file idempotent.
/// An individual item failure is logged and skipped; the rest of the batch
/// and all later batches still go through.
pub async fn write_records(
    store: &dyn RecordStore,
    records: &HashMap<PlantKey, PlantRecord>,
) -> Result<WriteSummary, StoreError> {
    let batch: Vec<PlantRecord> = records.values().cloned().collect();
    let mut summary = WriteSummary::default();

    for chunk in batch.chunks(BATCH_SIZE) {
        for outcome in store.put_batch(chunk).await? {
            match outcome {
                PutOutcome::Written => summary.written += 1,
                PutOutcome::Failed { plant_id, reason } => {
                    warn!(plant_id = %plant_id, %reason, "upsert failed, item skipped");
                    summary.failed += 1;
                }
            }
        }
    }

    Ok(summary)
}
