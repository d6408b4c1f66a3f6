use std::sync::Arc;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::{info, warn};
use crate::api::models::{AnalysisAccepted, CreateAnalysisRequest, ListQuery, RunStatusResponse};
use crate::api::{ApiError, AppState, RunHandle};
use crate::models::{RunStatus, TimeWindow};
use crate::pipeline::partitioner::partition;

const DEFAULT_PAGE_SIZE: usize = 20;
const MAX_PAGE_SIZE: usize = 200;

pub async fn create_analysis(
    State(state): State<AppState>,
    Json(req): Json<CreateAnalysisRequest>,
) -> Result<(StatusCode, Json<AnalysisAccepted>), ApiError> {
    // Reserved before validation; an early return drops the slot again
    let mut slot = state.try_reserve_run().ok_or_else(|| {
        ApiError::new(
            StatusCode::TOO_MANY_REQUESTS,
            format!("{} analyses are already running", state.max_concurrent_runs),
        )
    })?;

    let window = req
        .window
        .or_else(|| req.window_days.map(|days| TimeWindow::last_days(i64::from(days))));
    let request = state
        .engine
        .config()
        .resolve_request(req.scope, req.regions, window, req.mode);

    // Invalid requests are rejected here, before a run exists
    partition(&request, state.engine.catalog())?;

    let orchestrator = state.engine.orchestrator(request);
    let run_id = orchestrator.run_id().to_string();
    slot.register(
        run_id.clone(),
        RunHandle {
            state: orchestrator.state(),
            cancel_token: orchestrator.cancel_token(),
        },
    );

    let task_run_id = run_id.clone();
    tokio::spawn(async move {
        let _slot = slot;
        match orchestrator.run().await {
            Ok(outcome) => info!(run_id = %task_run_id, status = %outcome.status, "Analysis finished"),
            Err(e) => warn!(run_id = %task_run_id, error = %e, "Analysis ended without a report"),
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(AnalysisAccepted {
            run_id,
            status: RunStatus::Pending.to_string(),
        }),
    ))
}

pub async fn list_analyses(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0);

    let runs: Vec<RunStatusResponse> = state
        .store
        .list_runs(limit, offset)?
        .iter()
        .map(RunStatusResponse::from)
        .collect();

    Ok(Json(json!({ "runs": runs, "total": runs.len() })))
}

pub async fn get_status(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<RunStatusResponse>, ApiError> {
    // Active runs first: their in-memory state is ahead of the stored one
    let handle = state.active_runs.get(&run_id).map(|h| Arc::clone(h.value()));
    if let Some(handle) = handle {
        let run = handle.state.read().await;
        return Ok(Json(RunStatusResponse::from(&*run)));
    }

    match state.store.get_run(&run_id)? {
        Some(run) => Ok(Json(RunStatusResponse::from(&run))),
        None => Err(ApiError::not_found("Run not found")),
    }
}

pub async fn cancel_analysis(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let handle = state.active_runs.get(&run_id).map(|h| Arc::clone(h.value()));
    if let Some(handle) = handle {
        handle.cancel_token.cancel();
        info!(run_id = %run_id, "Cancellation requested");
        return Ok(Json(json!({ "run_id": run_id, "cancelled": true })));
    }

    match state.store.get_run(&run_id)? {
        Some(run) => Err(ApiError::conflict(format!("Run already finished with status {}", run.status))),
        None => Err(ApiError::not_found("Run not found")),
    }
}
