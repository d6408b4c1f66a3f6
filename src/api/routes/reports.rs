use axum::{
    extract::{Path, State},
    http::{header, HeaderName},
    response::{IntoResponse, Response},
};
use crate::api::{ApiError, AppState};
use crate::db::StoredReport;

/// The stored document, byte for byte, so clients can check it against its hash.
fn document_response(stored: StoredReport) -> Response {
    let headers = [
        (header::CONTENT_TYPE, "application/json".to_string()),
        (header::ETAG, format!("\"{}\"", stored.key.content_hash)),
        (HeaderName::from_static("x-report-version"), stored.key.version.to_string()),
    ];
    (headers, stored.document_json).into_response()
}

pub async fn get_latest_report(State(state): State<AppState>) -> Result<Response, ApiError> {
    match state.store.latest()? {
        Some(stored) => Ok(document_response(stored)),
        None => Err(ApiError::not_found("No report available yet")),
    }
}

pub async fn get_report(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Response, ApiError> {
    if let Some(stored) = state.store.get_report(&run_id)? {
        return Ok(document_response(stored));
    }
    if state.active_runs.contains_key(&run_id) {
        return Err(ApiError::conflict("Run has not completed yet"));
    }

    match state.store.get_run(&run_id)? {
        Some(run) if !run.status.is_terminal() => Err(ApiError::conflict("Run has not completed yet")),
        Some(run) => Err(ApiError::not_found(format!(
            "Run finished with status {} and has no report",
            run.status
        ))),
        None => Err(ApiError::not_found("Run not found")),
    }
}
