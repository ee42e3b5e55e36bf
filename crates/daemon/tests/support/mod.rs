#![allow(dead_code)]

use std::collections::HashSet;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use records_core::{Record, RecordDraft, RecordId};
use records_daemon::batch::{BatchProcessor, BatchSettings};
use records_daemon::pool::WorkerPool;
use records_storage::{InMemoryRecordStore, RecordStore, StoreError};

/// In-memory store with injectable faults and a probe on concurrent fetches.
#[derive(Default)]
pub struct ScriptedStore {
    inner: InMemoryRecordStore,
    fail_list: bool,
    fail_upsert: HashSet<RecordId>,
    vanish_on_get: HashSet<RecordId>,
    snapshot: Option<Vec<RecordId>>,
    get_latency: Duration,
    active_gets: AtomicUsize,
    peak_gets: AtomicUsize,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seeded(n: usize) -> Self {
        let store = Self::new();
        store.seed(n).await;
        store
    }

    pub async fn seed(&self, n: usize) {
        for i in 0..n {
            self.inner
                .insert(RecordDraft::new(
                    format!("Item {i}"),
                    format!("item{i}@example.com"),
                ))
                .await
                .unwrap();
        }
    }

    pub fn failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    pub fn failing_upsert(mut self, id: RecordId) -> Self {
        self.fail_upsert.insert(id);
        self
    }

    /// The record is deleted just before its unit fetches it.
    pub fn vanishing(mut self, id: RecordId) -> Self {
        self.vanish_on_get.insert(id);
        self
    }

    /// Report this id list from `list_ids` instead of the stored ids.
    pub fn with_snapshot(mut self, ids: Vec<RecordId>) -> Self {
        self.snapshot = Some(ids);
        self
    }

    pub fn with_get_latency(mut self, latency: Duration) -> Self {
        self.get_latency = latency;
        self
    }

    pub fn peak_concurrent_gets(&self) -> usize {
        self.peak_gets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for ScriptedStore {
    async fn list_ids(&self) -> Result<Vec<RecordId>, StoreError> {
        if self.fail_list {
            return Err(StoreError::unavailable("scripted list failure"));
        }
        match &self.snapshot {
            Some(ids) => Ok(ids.clone()),
            None => self.inner.list_ids().await,
        }
    }

    async fn list(&self) -> Result<Vec<Record>, StoreError> {
        self.inner.list().await
    }

    async fn get(&self, id: RecordId) -> Result<Option<Record>, StoreError> {
        if self.vanish_on_get.contains(&id) {
            self.inner.delete(id).await?;
        }

        let now = self.active_gets.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_gets.fetch_max(now, Ordering::SeqCst);
        if !self.get_latency.is_zero() {
            tokio::time::sleep(self.get_latency).await;
        }
        let found = self.inner.get(id).await;
        self.active_gets.fetch_sub(1, Ordering::SeqCst);
        found
    }

    async fn insert(&self, draft: RecordDraft) -> Result<Record, StoreError> {
        self.inner.insert(draft).await
    }

    async fn upsert(&self, record: Record) -> Result<Record, StoreError> {
        if self.fail_upsert.contains(&record.id) {
            return Err(StoreError::backend(format!("scripted write failure for {}", record.id)));
        }
        self.inner.upsert(record).await
    }

    async fn exists(&self, id: RecordId) -> Result<bool, StoreError> {
        self.inner.exists(id).await
    }

    async fn delete(&self, id: RecordId) -> Result<bool, StoreError> {
        self.inner.delete(id).await
    }
}

pub fn settings(unit_delay: Duration, deadline: Duration) -> BatchSettings {
    BatchSettings {
        unit_delay,
        deadline,
    }
}

pub fn processor(
    store: Arc<dyn RecordStore>,
    pool_size: usize,
    settings: BatchSettings,
) -> BatchProcessor {
    BatchProcessor::new(store, WorkerPool::new(pool_size), settings)
}

pub fn sorted_ids(records: &[Record]) -> Vec<RecordId> {
    let mut ids: Vec<_> = records.iter().map(|r| r.id).collect();
    ids.sort();
    ids
}

/// Collects formatted log lines from a subscriber installed for the current thread.
#[derive(Clone, Default)]
pub struct LogCapture {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.lock().unwrap().extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
