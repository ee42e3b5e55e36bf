//! Bounded-concurrency batch processing.
//!
//! A run snapshots every record id, fans one unit of work per id out to the
//! shared [`WorkerPool`], and joins all units under a single deadline. Units
//! re-read the record, mark it processed and write it back. A unit that cannot
//! finish is skipped and logged; only a failed snapshot or an expired deadline
//! fails the run.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use records_core::{new_ulid, Record, RecordId, STATUS_PROCESSED};
use records_storage::{RecordStore, StoreError};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{error, info, info_span, warn, Instrument};

use crate::pool::WorkerPool;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSettings {
    /// Fixed delay each unit waits before touching the store.
    pub unit_delay: Duration,
    /// Wall-clock budget for all units of one run, counted from submission.
    pub deadline: Duration,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            unit_delay: Duration::from_millis(100),
            deadline: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NotFound,
    Store(String),
    Interrupted,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotFound => write!(f, "not found"),
            SkipReason::Store(e) => write!(f, "store error: {e}"),
            SkipReason::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// Terminal state of one unit of work.
#[derive(Debug)]
enum ProcessingOutcome {
    Processed(Record),
    Skipped { id: RecordId, reason: SkipReason },
}

impl ProcessingOutcome {
    fn skipped(id: RecordId, reason: SkipReason) -> Self {
        Self::Skipped { id, reason }
    }
}

/// A unit that ended without writing its record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub id: RecordId,
    pub reason: SkipReason,
}

/// Everything a finished run observed. `processed` is in completion order.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub submitted: usize,
    pub processed: Vec<Record>,
    pub skipped: Vec<Skipped>,
    /// Units whose task died (panic) before producing an outcome.
    pub lost: usize,
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("failed to snapshot record ids: {0}")]
    Snapshot(#[source] StoreError),
    #[error("batch deadline of {deadline:?} exceeded with {pending} of {submitted} units unfinished")]
    DeadlineExceeded {
        deadline: Duration,
        pending: usize,
        submitted: usize,
    },
}

/// Receiving half of a run's cancellation signal.
#[derive(Clone)]
struct CancelSignal(watch::Receiver<bool>);

impl CancelSignal {
    /// Resolves once the run signals cancellation or its owner goes away.
    async fn cancelled(&mut self) {
        let _ = self.0.wait_for(|cancelled| *cancelled).await;
    }
}

pub struct BatchProcessor {
    store: Arc<dyn RecordStore>,
    pool: WorkerPool,
    settings: BatchSettings,
}

impl BatchProcessor {
    pub fn new(store: Arc<dyn RecordStore>, pool: WorkerPool, settings: BatchSettings) -> Self {
        Self {
            store,
            pool,
            settings,
        }
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn settings(&self) -> &BatchSettings {
        &self.settings
    }

    /// Process every record and return the ones that reached the processed state.
    pub async fn run_batch(&self) -> Result<Vec<Record>, BatchError> {
        self.run_report().await.map(|report| report.processed)
    }

    /// Like [`run_batch`](Self::run_batch), keeping skip details and counts.
    pub async fn run_report(&self) -> Result<BatchReport, BatchError> {
        let run_id = new_ulid();
        self.execute()
            .instrument(info_span!("batch", %run_id))
            .await
    }

    async fn execute(&self) -> Result<BatchReport, BatchError> {
        let ids = self.store.list_ids().await.map_err(|e| {
            error!(error = %e, "failed to snapshot record ids");
            BatchError::Snapshot(e)
        })?;

        if ids.is_empty() {
            info!("no records to process");
            return Ok(BatchReport::default());
        }

        let submitted = ids.len();
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let deadline = Instant::now() + self.settings.deadline;

        let mut units = JoinSet::new();
        for id in ids {
            units.spawn(
                run_unit(
                    Arc::clone(&self.store),
                    self.pool.clone(),
                    id,
                    self.settings.unit_delay,
                    CancelSignal(cancel_rx.clone()),
                )
                .in_current_span(),
            );
        }
        info!(
            submitted,
            pool_capacity = self.pool.capacity(),
            "batch submitted"
        );

        let mut report = BatchReport {
            submitted,
            ..BatchReport::default()
        };

        match tokio::time::timeout_at(deadline, join_all(&mut units, &mut report)).await {
            Ok(()) => {
                info!(
                    submitted,
                    processed = report.processed.len(),
                    skipped = report.skipped.len(),
                    lost = report.lost,
                    "batch finished"
                );
                Ok(report)
            }
            Err(_) => {
                let pending = units.len();
                let _ = cancel_tx.send(true);
                // Outstanding units observe the signal, log their skip and free their slots.
                units.detach_all();
                error!(
                    submitted,
                    pending,
                    deadline = ?self.settings.deadline,
                    "batch deadline exceeded"
                );
                Err(BatchError::DeadlineExceeded {
                    deadline: self.settings.deadline,
                    pending,
                    submitted,
                })
            }
        }
    }
}

async fn join_all(units: &mut JoinSet<ProcessingOutcome>, report: &mut BatchReport) {
    while let Some(joined) = units.join_next().await {
        match joined {
            Ok(ProcessingOutcome::Processed(record)) => report.processed.push(record),
            Ok(ProcessingOutcome::Skipped { id, reason }) => {
                report.skipped.push(Skipped { id, reason })
            }
            Err(e) => {
                warn!(error = %e, "unit of work ended without an outcome");
                report.lost += 1;
            }
        }
    }
}

async fn run_unit(
    store: Arc<dyn RecordStore>,
    pool: WorkerPool,
    id: RecordId,
    delay: Duration,
    mut cancel: CancelSignal,
) -> ProcessingOutcome {
    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => ProcessingOutcome::skipped(id, SkipReason::Interrupted),
        outcome = process_record(store.as_ref(), &pool, id, delay) => outcome,
    };

    if let ProcessingOutcome::Skipped { reason, .. } = &outcome {
        warn!(record_id = id, %reason, "record skipped");
    }
    outcome
}

/// Slot, delay, re-fetch, mark, write. Dropping this future at any await point
/// releases the slot and leaves the stored record either untouched or fully written.
async fn process_record(
    store: &dyn RecordStore,
    pool: &WorkerPool,
    id: RecordId,
    delay: Duration,
) -> ProcessingOutcome {
    let Ok(_slot) = pool.acquire().await else {
        return ProcessingOutcome::skipped(id, SkipReason::Interrupted);
    };

    tokio::time::sleep(delay).await;

    let mut record = match store.get(id).await {
        Ok(Some(record)) => record,
        Ok(None) => return ProcessingOutcome::skipped(id, SkipReason::NotFound),
        Err(e) => return ProcessingOutcome::skipped(id, SkipReason::Store(e.to_string())),
    };

    record.status = Some(STATUS_PROCESSED.to_string());

    match store.upsert(record).await {
        Ok(stored) => ProcessingOutcome::Processed(stored),
        Err(e) => ProcessingOutcome::skipped(id, SkipReason::Store(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use records_core::RecordDraft;
    use records_storage::InMemoryRecordStore;

    /// Delegates to an in-memory store but panics when fetching one id.
    struct PanickingStore {
        inner: InMemoryRecordStore,
        poison: RecordId,
    }

    #[async_trait]
    impl RecordStore for PanickingStore {
        async fn list_ids(&self) -> Result<Vec<RecordId>, StoreError> {
            self.inner.list_ids().await
        }
        async fn list(&self) -> Result<Vec<Record>, StoreError> {
            self.inner.list().await
        }
        async fn get(&self, id: RecordId) -> Result<Option<Record>, StoreError> {
            if id == self.poison {
                panic!("fetch of record {id} blew up");
            }
            self.inner.get(id).await
        }
        async fn insert(&self, draft: RecordDraft) -> Result<Record, StoreError> {
            self.inner.insert(draft).await
        }
        async fn upsert(&self, record: Record) -> Result<Record, StoreError> {
            self.inner.upsert(record).await
        }
        async fn exists(&self, id: RecordId) -> Result<bool, StoreError> {
            self.inner.exists(id).await
        }
        async fn delete(&self, id: RecordId) -> Result<bool, StoreError> {
            self.inner.delete(id).await
        }
    }

    async fn seeded(n: usize) -> InMemoryRecordStore {
        let store = InMemoryRecordStore::new();
        for i in 0..n {
            store
                .insert(RecordDraft::new(format!("item{i}"), format!("item{i}@example.com")))
                .await
                .unwrap();
        }
        store
    }

    fn settings(delay_ms: u64, deadline_ms: u64) -> BatchSettings {
        BatchSettings {
            unit_delay: Duration::from_millis(delay_ms),
            deadline: Duration::from_millis(deadline_ms),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_unit_is_isolated() {
        let store = PanickingStore {
            inner: seeded(3).await,
            poison: 2,
        };
        let pool = WorkerPool::new(2);
        let processor = BatchProcessor::new(Arc::new(store), pool.clone(), settings(10, 1_000));

        let report = processor.run_report().await.unwrap();

        assert_eq!(report.submitted, 3);
        assert_eq!(report.lost, 1);
        let mut ids: Vec<_> = report.processed.iter().map(|r| r.id).collect();
        ids.sort();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_units_are_interrupted_and_release_slots() {
        let store = Arc::new(seeded(6).await);
        let pool = WorkerPool::new(2);
        let processor = BatchProcessor::new(store.clone(), pool.clone(), settings(1_000, 1_500));

        let err = processor.run_batch().await.unwrap_err();
        match err {
            BatchError::DeadlineExceeded {
                pending, submitted, ..
            } => {
                assert_eq!(submitted, 6);
                assert_eq!(pending, 4);
            }
            other => panic!("expected deadline error, got {other:?}"),
        }

        // Give the detached units a chance to observe cancellation.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(pool.available(), 2);

        // Only the first wave finished; everything after the deadline was left untouched.
        let processed = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .filter(Record::is_processed)
            .count();
        assert_eq!(processed, 2);
    }

    #[test]
    fn skip_reasons_render_for_logs() {
        assert_eq!(SkipReason::NotFound.to_string(), "not found");
        assert_eq!(SkipReason::Interrupted.to_string(), "interrupted");
        assert_eq!(
            SkipReason::Store("disk full".into()).to_string(),
            "store error: disk full"
        );
    }
}
