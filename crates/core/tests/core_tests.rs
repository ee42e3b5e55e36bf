//! Integration tests for the core crate.

use records_core::api::{ErrorDetails, ProcessingStarted, ValidationErrorResponse};
use records_core::{validate_draft, Record, RecordDraft, STATUS_NEW, STATUS_PROCESSED};

#[test]
fn test_draft_into_record_defaults_status() {
    let record = RecordDraft::new("Laptop", "test@email.com")
        .with_description("Lenovo Thinkpad")
        .into_record(1);

    assert_eq!(record.id, 1);
    assert_eq!(record.name, "Laptop");
    assert_eq!(record.description.as_deref(), Some("Lenovo Thinkpad"));
    assert_eq!(record.status.as_deref(), Some(STATUS_NEW));
    assert!(!record.is_processed());
}

#[test]
fn test_initial_status_defaults_to_new() {
    assert_eq!(RecordDraft::new("Laptop", "test@email.com").initial_status(), STATUS_NEW);
    assert_eq!(
        RecordDraft::new("Laptop", "test@email.com")
            .with_status("IN_REVIEW")
            .initial_status(),
        "IN_REVIEW"
    );
}

#[test]
fn test_draft_into_record_keeps_explicit_status() {
    let record = RecordDraft::new("Laptop", "test@email.com")
        .with_status(STATUS_PROCESSED)
        .into_record(7);
    assert!(record.is_processed());
}

#[test]
fn test_apply_replaces_all_fields_but_id() {
    let mut record = RecordDraft::new("Laptop", "test@email.com")
        .with_description("Lenovo Thinkpad")
        .into_record(1);

    record.apply(RecordDraft::new("Monitor", "mail@dell.com").with_status("UPDATED"));

    assert_eq!(record.id, 1);
    assert_eq!(record.name, "Monitor");
    assert_eq!(record.description, None);
    assert_eq!(record.status.as_deref(), Some("UPDATED"));
    assert_eq!(record.email, "mail@dell.com");
}

#[test]
fn test_record_serde() {
    let record = RecordDraft::new("Item1", "a@a.com").into_record(3);
    let serialized = serde_json::to_value(&record).unwrap();
    assert_eq!(
        serialized,
        serde_json::json!({
            "id": 3,
            "name": "Item1",
            "description": null,
            "status": "NEW",
            "email": "a@a.com",
        })
    );
    let deserialized: Record = serde_json::from_value(serialized).unwrap();
    assert_eq!(deserialized, record);
}

#[test]
fn test_draft_accepts_missing_fields() {
    let draft: RecordDraft = serde_json::from_str(r#"{"description":"no name"}"#).unwrap();
    assert_eq!(draft.name, None);
    assert_eq!(draft.email, None);
    assert!(validate_draft(&draft).is_err());
}

#[test]
fn test_validation_error_response_shape() {
    let errors = validate_draft(&RecordDraft::default()).unwrap_err();
    let body = serde_json::to_value(ValidationErrorResponse::from(errors)).unwrap();
    assert_eq!(body["message"], "Validation Failed");
    assert_eq!(body["errors"]["name"], "Name is required");
    assert_eq!(body["errors"]["email"], "Email cannot be blank");
    assert!(body["timestamp_ms"].as_i64().unwrap() > 0);
}

#[test]
fn test_error_details_and_ack_payloads() {
    let details = ErrorDetails::new("Record not found with id: 9", "Record update failed");
    assert_eq!(details.details, "Record update failed");

    let ack = serde_json::to_value(ProcessingStarted::default()).unwrap();
    assert_eq!(ack["status"], "Processing started");
}
