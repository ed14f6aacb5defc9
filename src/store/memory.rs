//! In-memory implementations of the storage ports, used by tests and handy
//! for local experiments. Failure injection mimics the partial outages the
//! poller has to survive.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use super::object::ObjectStore;
use super::records::{PutOutcome, RecordStore};
use crate::error::StoreError;
use crate::process::PlantRecord;

#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    fail_copies: Mutex<HashSet<String>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, key: &str, bytes: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), bytes.to_vec());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    /// Make every `copy` with this source key fail until cleared, to
    /// simulate a crash between write and relocation.
    pub fn fail_copy_for(&self, key: &str) {
        self.fail_copies.lock().unwrap().insert(key.to_string());
    }

    pub fn clear_copy_failures(&self) {
        self.fail_copies.lock().unwrap().clear();
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn ensure_bucket(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NoSuchKey(key.to_string()))
    }

    async fn copy(&self, src: &str, dst: &str) -> Result<(), StoreError> {
        if self.fail_copies.lock().unwrap().contains(src) {
            return Err(StoreError::Backend(format!("injected copy failure: {src}")));
        }
        let mut objects = self.objects.lock().unwrap();
        let bytes = objects
            .get(src)
            .cloned()
            .ok_or_else(|| StoreError::NoSuchKey(src.to_string()))?;
        objects.insert(dst.to_string(), bytes);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.objects
            .lock()
            .unwrap()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::NoSuchKey(key.to_string()))
    }
}

#[derive(Default)]
pub struct MemoryRecordStore {
    items: Mutex<BTreeMap<String, PlantRecord>>,
    fail_plant_ids: Mutex<HashSet<String>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every upsert of this plant id fail, to simulate an item-level
    /// write error inside a batch.
    pub fn fail_writes_for(&self, plant_id: &str) {
        self.fail_plant_ids
            .lock()
            .unwrap()
            .insert(plant_id.to_string());
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, plant_id: &str) -> Option<PlantRecord> {
        self.items.lock().unwrap().get(plant_id).cloned()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn ensure_table(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn put_batch(&self, records: &[PlantRecord]) -> Result<Vec<PutOutcome>, StoreError> {
        let failing = self.fail_plant_ids.lock().unwrap();
        let mut items = self.items.lock().unwrap();
        Ok(records
            .iter()
            .map(|record| {
                if failing.contains(&record.plant_id) {
                    PutOutcome::Failed {
                        plant_id: record.plant_id.clone(),
                        reason: "injected write failure".to_string(),
                    }
                } else {
                    items.insert(record.plant_id.clone(), record.clone());
                    PutOutcome::Written
                }
            })
            .collect())
    }

    async fn scan(&self, state: Option<&str>) -> Result<Vec<PlantRecord>, StoreError> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .values()
            .filter(|record| state.map_or(true, |s| record.state == s))
            .cloned()
            .collect())
    }
}
