use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::model::RecordDraft;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9_+&*-]+(?:\.[a-zA-Z0-9_+&*-]+)*@(?:[a-zA-Z0-9-]+\.)+[a-zA-Z]{2,7}$")
        .expect("email pattern is a valid regex")
});

/// Field-level validation failures, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: BTreeMap<String, String>,
}

impl ValidationErrors {
    /// Record a failure for `field`. The first message per field wins.
    pub fn add(&mut self, field: &str, message: &str) {
        self.fields
            .entry(field.to_string())
            .or_insert_with(|| message.to_string());
    }

    /// True when no field failed.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Message recorded for `field`, if any.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// All failures, ordered by field name.
    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// Consume into the field map sent to clients.
    pub fn into_fields(self) -> BTreeMap<String, String> {
        self.fields
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed")?;
        for (i, (field, message)) in self.fields.iter().enumerate() {
            let sep = if i == 0 { ": " } else { ", " };
            write!(f, "{sep}{field}: {message}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Returns true if `email` matches the accepted address grammar.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// Check a create/update payload. All failing fields are reported at once.
pub fn validate_draft(draft: &RecordDraft) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();

    if draft.name.as_deref().map_or(true, |n| n.trim().is_empty()) {
        errors.add("name", "Name is required");
    }

    match draft.email.as_deref() {
        None => errors.add("email", "Email cannot be blank"),
        Some(email) if email.trim().is_empty() => errors.add("email", "Email cannot be blank"),
        Some(email) if !is_valid_email(email) => {
            errors.add("email", "Email must be in a valid format")
        }
        Some(_) => {}
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
