use async_trait::async_trait;
use records_core::{Record, RecordDraft, RecordId};

use crate::StoreError;

/// Durable record storage keyed by identifier.
///
/// Every method is atomic on its own: a caller dropped mid-call either sees the
/// operation applied in full or not at all. No method holds state across calls.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Every stored identifier, ascending.
    async fn list_ids(&self) -> Result<Vec<RecordId>, StoreError>;

    /// Every stored record, ascending by identifier.
    async fn list(&self) -> Result<Vec<Record>, StoreError>;

    async fn get(&self, id: RecordId) -> Result<Option<Record>, StoreError>;

    /// Store a new record under a freshly assigned identifier.
    async fn insert(&self, draft: RecordDraft) -> Result<Record, StoreError>;

    /// Create or fully replace the record at `record.id`. Returns the stored value.
    async fn upsert(&self, record: Record) -> Result<Record, StoreError>;

    async fn exists(&self, id: RecordId) -> Result<bool, StoreError>;

    /// Returns true if a record was removed.
    async fn delete(&self, id: RecordId) -> Result<bool, StoreError>;
}
