use axum::{extract::State, Json};
use serde_json::{json, Value};
use crate::api::AppState;

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "costscope",
        "version": env!("CARGO_PKG_VERSION"),
        "git_hash": option_env!("GIT_HASH").unwrap_or("dev"),
        "build_timestamp": option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        "active_runs": state.active_runs.len(),
        "catalog_size": state.engine.catalog().len(),
    }))
}
