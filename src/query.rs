//! Read views over the record store: ranked and filtered, never mutated.
//! Both operations scan the whole table (the store port drains its own
//! pagination), filter in memory, and sort by net generation descending.

use crate::error::StoreError;
use crate::process::PlantRecord;
use crate::store::RecordStore;

/// Top `limit` plants by net generation, optionally restricted to a state.
pub async fn top(
    store: &dyn RecordStore,
    limit: usize,
    state: Option<&str>,
) -> Result<Vec<PlantRecord>, StoreError> {
    let state = state.map(str::to_uppercase);
    let mut items = store.scan(state.as_deref()).await?;
    sort_by_net_desc(&mut items);
    items.truncate(limit);
    Ok(items)
}

/// Plants whose name contains `q` case-insensitively, optionally restricted
/// to a state, sorted by net generation descending.
pub async fn search(
    store: &dyn RecordStore,
    q: Option<&str>,
    state: Option<&str>,
) -> Result<Vec<PlantRecord>, StoreError> {
    let state = state.map(str::to_uppercase);
    let mut items = store.scan(state.as_deref()).await?;
    if let Some(q) = q {
        let q = q.to_lowercase();
        items.retain(|record| record.plant_name_lc.contains(&q));
    }
    sort_by_net_desc(&mut items);
    Ok(items)
}

fn sort_by_net_desc(items: &mut [PlantRecord]) {
    items.sort_by(|a, b| b.net_generation_mwh.cmp(&a.net_generation_mwh));
}
