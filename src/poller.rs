// src/poller.rs

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::{sync::Arc, time::Duration};
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::process::{decode_text, process_text, FileAggregate};
use crate::schema::AliasTable;
use crate::store::{write_records, ObjectStore, RecordStore};

/// File suffix the discovery pass recognizes, matched case-insensitively.
const TABULAR_SUFFIX: &str = ".csv";

/// Drives the discover, process, relocate lifecycle over the incoming
/// prefix. Processing is strictly sequential: one object is fully handled
/// before the next begins, so a run never races itself on a plant key.
pub struct Poller {
    objects: Arc<dyn ObjectStore>,
    records: Arc<dyn RecordStore>,
    aliases: AliasTable,
    incoming_prefix: String,
    processed_prefix: String,
}

/// What one discovery pass did, for the log line at the end of the pass.
#[derive(Debug, Clone, Copy)]
pub struct PassSummary {
    pub objects_seen: usize,
    pub objects_processed: usize,
    pub objects_failed: usize,
    pub records_written: usize,
    pub rows_skipped: usize,
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
}

impl Poller {
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        records: Arc<dyn RecordStore>,
        aliases: AliasTable,
        incoming_prefix: impl Into<String>,
        processed_prefix: impl Into<String>,
    ) -> Self {
        Self {
            objects,
            records,
            aliases,
            incoming_prefix: incoming_prefix.into(),
            processed_prefix: processed_prefix.into(),
        }
    }

    /// Create the bucket and the table if absent. Run once before the first
    /// pass; both collaborators treat it as a no-op thereafter.
    pub async fn ensure_collaborators(&self) -> Result<()> {
        self.objects
            .ensure_bucket()
            .await
            .context("ensuring bucket")?;
        self.records
            .ensure_table()
            .await
            .context("ensuring table")?;
        Ok(())
    }

    /// One discovery pass over the incoming prefix.
    ///
    /// Each listed tabular object is fetched, processed and relocated in
    /// turn. A failure on one object is logged and skipped; the object
    /// stays under the incoming prefix and is retried on the next pass,
    /// which is what makes delivery at-least-once.
    pub async fn run_pass(&self) -> Result<PassSummary> {
        let started = Utc::now();
        let keys = self
            .objects
            .list(&self.incoming_prefix)
            .await
            .context("listing incoming prefix")?;

        let mut objects_seen = 0;
        let mut objects_processed = 0;
        let mut objects_failed = 0;
        let mut records_written = 0;
        let mut rows_skipped = 0;

        for key in keys {
            if !key.to_lowercase().ends_with(TABULAR_SUFFIX) {
                continue;
            }
            objects_seen += 1;

            match self.process_object(&key).await {
                Ok(outcome) => {
                    objects_processed += 1;
                    records_written += outcome.written;
                    rows_skipped += outcome.rows_skipped;
                    info!(
                        key = %key,
                        written = outcome.written,
                        skipped = outcome.rows_skipped,
                        "processed"
                    );
                }
                Err(e) => {
                    objects_failed += 1;
                    error!(key = %key, error = %format!("{e:#}"), "object failed, will retry next pass");
                }
            }
        }

        Ok(PassSummary {
            objects_seen,
            objects_processed,
            objects_failed,
            records_written,
            rows_skipped,
            started,
            finished: Utc::now(),
        })
    }

    /// Poll forever: one pass, sleep, repeat. Nothing a pass does is fatal.
    pub async fn run(&self, interval: Duration) -> Result<()> {
        loop {
            match self.run_pass().await {
                Ok(summary) => info!(
                    seen = summary.objects_seen,
                    processed = summary.objects_processed,
                    failed = summary.objects_failed,
                    written = summary.records_written,
                    elapsed_ms = (summary.finished - summary.started).num_milliseconds(),
                    "pass complete"
                ),
                Err(e) => error!("pass failed: {e:#}"),
            }
            sleep(interval).await;
        }
    }

    async fn process_object(&self, key: &str) -> Result<ObjectOutcome> {
        let bytes = self
            .objects
            .get(key)
            .await
            .with_context(|| format!("fetching {key}"))?;
        let text = decode_text(&bytes);

        let aggregate = match process_text(&text, &self.aliases) {
            Ok(aggregate) => aggregate,
            Err(e) => {
                // The file as a whole is unusable, which is handled, not
                // retried: consume it with zero records so the poller does
                // not rediscover it forever.
                warn!(key = %key, error = %e, "rejected file, consuming with zero records");
                FileAggregate::default()
            }
        };

        let write = write_records(self.records.as_ref(), &aggregate.records)
            .await
            .with_context(|| format!("writing records from {key}"))?;

        // The write above is the durability point. Relocation is cleanup: if
        // it fails the object is reprocessed next pass, and the replacing
        // upserts land on identical values.
        self.relocate(key)
            .await
            .with_context(|| format!("relocating {key}"))?;

        Ok(ObjectOutcome {
            written: write.written,
            rows_skipped: aggregate.skips.total(),
        })
    }

    async fn relocate(&self, key: &str) -> Result<()> {
        let rest = key.strip_prefix(&self.incoming_prefix).unwrap_or(key);
        let dest = format!("{}{}", self.processed_prefix, rest);
        self.objects.copy(key, &dest).await?;
        self.objects.delete(key).await?;
        Ok(())
    }
}

struct ObjectOutcome {
    written: usize,
    rows_skipped: usize,
}
