use serde::{Deserialize, Serialize};

/// Store-assigned record identifier.
pub type RecordId = i64;

/// Status given to records created without one.
pub const STATUS_NEW: &str = "NEW";

/// Terminal status written by the batch processor.
pub const STATUS_PROCESSED: &str = "PROCESSED";

/// A persisted record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Assigned by the store, never reassigned.
    pub id: RecordId,
    /// Non-blank display name.
    pub name: String,
    /// Optional free text.
    #[serde(default)]
    pub description: Option<String>,
    /// Free-form lifecycle label.
    #[serde(default)]
    pub status: Option<String>,
    /// Contact address.
    pub email: String,
}

impl Record {
    /// True once the batch processor has marked this record.
    pub fn is_processed(&self) -> bool {
        self.status.as_deref() == Some(STATUS_PROCESSED)
    }

    /// Replace every mutable field with the draft's values, keeping the id.
    pub fn apply(&mut self, draft: RecordDraft) {
        self.name = draft.name.unwrap_or_default();
        self.description = draft.description;
        self.status = draft.status;
        self.email = draft.email.unwrap_or_default();
    }
}

/// Client-supplied record fields for create and update.
///
/// Fields are optional so that a missing `name` or `email` surfaces as a
/// validation error instead of a decode failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDraft {
    /// Required by validation.
    #[serde(default)]
    pub name: Option<String>,
    /// Optional free text.
    #[serde(default)]
    pub description: Option<String>,
    /// Defaults to `NEW` on create.
    #[serde(default)]
    pub status: Option<String>,
    /// Required by validation.
    #[serde(default)]
    pub email: Option<String>,
}

impl RecordDraft {
    /// Draft with the two required fields set.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            email: Some(email.into()),
            ..Self::default()
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set an explicit status.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Status a new row is stored with: the draft's own, else `NEW`.
    pub fn initial_status(&self) -> &str {
        self.status.as_deref().unwrap_or(STATUS_NEW)
    }

    /// Build the record stored under `id`, defaulting the status for new rows.
    pub fn into_record(self, id: RecordId) -> Record {
        let status = self.initial_status().to_string();
        Record {
            id,
            name: self.name.unwrap_or_default(),
            description: self.description,
            status: Some(status),
            email: self.email.unwrap_or_default(),
        }
    }
}
