use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use records_core::api::{ErrorDetails, ProcessingStarted, ValidationErrorResponse};
use records_core::{Record, RecordDraft, RecordId};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::service::{RecordService, ServiceError};

#[derive(Clone)]
pub struct AppState {
    svc: Arc<RecordService>,
}

pub fn router(svc: Arc<RecordService>) -> Router {
    let state = AppState { svc };
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/records", get(list_records).post(create_record))
        .route("/api/records/process", get(process_records))
        .route("/api/records/process-async", get(process_records_detached))
        .route(
            "/api/records/{id}",
            get(get_record).put(update_record).delete(delete_record),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn list_records(State(st): State<AppState>) -> Result<Json<Vec<Record>>, AppError> {
    let records = st
        .svc
        .list()
        .await
        .map_err(|e| AppError::new(e, "uri=/api/records"))?;
    Ok(Json(records))
}

async fn create_record(
    State(st): State<AppState>,
    Json(draft): Json<RecordDraft>,
) -> Result<(StatusCode, Json<Record>), AppError> {
    let record = st
        .svc
        .create(draft)
        .await
        .map_err(|e| AppError::new(e, "uri=/api/records"))?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn get_record(
    State(st): State<AppState>,
    Path(id): Path<RecordId>,
) -> Result<Json<Record>, AppError> {
    let record = st
        .svc
        .get(id)
        .await
        .map_err(|e| AppError::new(e, format!("uri=/api/records/{id}")))?;
    Ok(Json(record))
}

async fn update_record(
    State(st): State<AppState>,
    Path(id): Path<RecordId>,
    Json(draft): Json<RecordDraft>,
) -> Result<Json<Record>, AppError> {
    let record = st
        .svc
        .update(id, draft)
        .await
        .map_err(|e| AppError::new(e, "Record update failed"))?;
    Ok(Json(record))
}

async fn delete_record(
    State(st): State<AppState>,
    Path(id): Path<RecordId>,
) -> Result<StatusCode, AppError> {
    st.svc
        .delete(id)
        .await
        .map_err(|e| AppError::new(e, "Record deletion failed"))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn process_records(State(st): State<AppState>) -> Result<Json<Vec<Record>>, AppError> {
    let records = st
        .svc
        .process_synchronously()
        .await
        .map_err(|e| AppError::new(e, "uri=/api/records/process"))?;
    Ok(Json(records))
}

async fn process_records_detached(State(st): State<AppState>) -> impl IntoResponse {
    st.svc.process_detached();
    (StatusCode::ACCEPTED, Json(ProcessingStarted::default()))
}

/// A failed request: the service error plus the `details` line of the error body.
#[derive(Debug)]
pub struct AppError {
    error: ServiceError,
    details: String,
}

impl AppError {
    pub fn new(error: impl Into<ServiceError>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.error {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Store(_) | ServiceError::Batch(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        match self.error {
            ServiceError::Validation(errors) => {
                (status, Json(ValidationErrorResponse::from(errors))).into_response()
            }
            error => {
                if status.is_server_error() {
                    tracing::error!(error = %error, "request failed");
                }
                let body = ErrorDetails::new(error.to_string(), self.details);
                (status, Json(body)).into_response()
            }
        }
    }
}
