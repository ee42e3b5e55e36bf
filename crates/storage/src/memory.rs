use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use records_core::{Record, RecordDraft, RecordId};

use crate::traits::RecordStore;
use crate::StoreError;

/// In-memory storage. Not durable; used for the default daemon mode and tests.
#[derive(Default)]
pub struct InMemoryRecordStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    records: BTreeMap<RecordId, Record>,
    last_id: RecordId,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::unavailable("in-memory store lock poisoned"))
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn list_ids(&self) -> Result<Vec<RecordId>, StoreError> {
        Ok(self.lock()?.records.keys().copied().collect())
    }

    async fn list(&self) -> Result<Vec<Record>, StoreError> {
        Ok(self.lock()?.records.values().cloned().collect())
    }

    async fn get(&self, id: RecordId) -> Result<Option<Record>, StoreError> {
        Ok(self.lock()?.records.get(&id).cloned())
    }

    async fn insert(&self, draft: RecordDraft) -> Result<Record, StoreError> {
        let mut inner = self.lock()?;
        inner.last_id += 1;
        let record = draft.into_record(inner.last_id);
        inner.records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn upsert(&self, record: Record) -> Result<Record, StoreError> {
        let mut inner = self.lock()?;
        // Keep future inserts clear of explicitly chosen ids.
        inner.last_id = inner.last_id.max(record.id);
        inner.records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn exists(&self, id: RecordId) -> Result<bool, StoreError> {
        Ok(self.lock()?.records.contains_key(&id))
    }

    async fn delete(&self, id: RecordId) -> Result<bool, StoreError> {
        Ok(self.lock()?.records.remove(&id).is_some())
    }
}
