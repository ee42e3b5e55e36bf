#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Shared record model, validation rules and HTTP payloads for the record daemon
//! and its clients.

/// JSON bodies exchanged over the HTTP API.
pub mod api;
/// Records and the drafts that create or replace them.
pub mod model;
/// Payload checks applied before anything reaches the store.
pub mod validation;

mod util;

pub use model::*;
pub use util::{new_ulid, now_ms, EpochMs};
pub use validation::{validate_draft, ValidationErrors};
