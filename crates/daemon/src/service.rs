use std::sync::Arc;

use records_core::{validate_draft, Record, RecordDraft, RecordId, ValidationErrors};
use records_storage::{RecordStore, StoreError};
use thiserror::Error;
use tracing::{error, info};

use crate::batch::{BatchError, BatchProcessor};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Record not found with id: {0}")]
    NotFound(RecordId),
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Batch(#[from] BatchError),
}

/// Record CRUD plus the two ways of starting a batch run.
pub struct RecordService {
    store: Arc<dyn RecordStore>,
    processor: Arc<BatchProcessor>,
}

impl RecordService {
    pub fn new(store: Arc<dyn RecordStore>, processor: Arc<BatchProcessor>) -> Self {
        Self { store, processor }
    }

    pub fn processor(&self) -> &Arc<BatchProcessor> {
        &self.processor
    }

    pub async fn list(&self) -> Result<Vec<Record>, ServiceError> {
        Ok(self.store.list().await?)
    }

    pub async fn get(&self, id: RecordId) -> Result<Record, ServiceError> {
        self.store
            .get(id)
            .await?
            .ok_or(ServiceError::NotFound(id))
    }

    pub async fn create(&self, draft: RecordDraft) -> Result<Record, ServiceError> {
        validate_draft(&draft)?;
        let record = self.store.insert(draft).await?;
        info!(record_id = record.id, "record created");
        Ok(record)
    }

    /// Replace every mutable field of an existing record.
    pub async fn update(&self, id: RecordId, draft: RecordDraft) -> Result<Record, ServiceError> {
        validate_draft(&draft)?;
        let mut record = self.get(id).await?;
        record.apply(draft);
        let record = self.store.upsert(record).await?;
        info!(record_id = id, "record updated");
        Ok(record)
    }

    pub async fn delete(&self, id: RecordId) -> Result<(), ServiceError> {
        if !self.store.exists(id).await? {
            return Err(ServiceError::NotFound(id));
        }
        // A concurrent delete between the check and here also counts as not found.
        if !self.store.delete(id).await? {
            return Err(ServiceError::NotFound(id));
        }
        info!(record_id = id, "record deleted");
        Ok(())
    }

    /// Run one batch and wait for it, bounded by the batch deadline.
    pub async fn process_synchronously(&self) -> Result<Vec<Record>, BatchError> {
        self.processor.run_batch().await
    }

    /// Start one batch on the runtime and return at once. The outcome is logged only.
    pub fn process_detached(&self) {
        let processor = Arc::clone(&self.processor);
        tokio::spawn(async move {
            match processor.run_batch().await {
                Ok(records) => info!(processed = records.len(), "detached batch finished"),
                Err(e) => error!(error = %e, "detached batch failed"),
            }
        });
    }
}
