use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::util::{now_ms, EpochMs};
use crate::validation::ValidationErrors;

/// Error body for not-found and internal failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// When the error was produced.
    pub timestamp_ms: EpochMs,
    /// The error itself, e.g. `Record not found with id: 7`.
    pub message: String,
    /// Request context: the URI or the failed operation.
    pub details: String,
}

impl ErrorDetails {
    /// Stamp a new error body with the current time.
    pub fn new(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            timestamp_ms: now_ms(),
            message: message.into(),
            details: details.into(),
        }
    }
}

/// Error body for rejected create/update payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorResponse {
    /// When the payload was rejected.
    pub timestamp_ms: EpochMs,
    /// Always `Validation Failed`.
    pub message: String,
    /// Field name to failure message.
    pub errors: BTreeMap<String, String>,
}

impl From<ValidationErrors> for ValidationErrorResponse {
    fn from(errors: ValidationErrors) -> Self {
        Self {
            timestamp_ms: now_ms(),
            message: "Validation Failed".into(),
            errors: errors.into_fields(),
        }
    }
}

/// Acknowledgement returned when a detached batch run has been scheduled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessingStarted {
    /// Short status line.
    pub status: String,
    /// Human-readable explanation.
    pub message: String,
}

impl Default for ProcessingStarted {
    fn default() -> Self {
        Self {
            status: "Processing started".into(),
            message: "Records are being processed asynchronously".into(),
        }
    }
}
