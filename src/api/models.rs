use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::models::{AnalysisMode, AnalysisRequest, ServiceScope, TimeWindow};
use crate::pipeline::{RunProgress, RunState};

/// Body of `POST /api/analyses`. Omitted fields fall back to the configured defaults.
#[derive(Debug, Default, Deserialize)]
pub struct CreateAnalysisRequest {
    pub scope: Option<ServiceScope>,
    pub regions: Option<Vec<String>>,
    pub window: Option<TimeWindow>,
    /// Shorthand for a window ending today.
    pub window_days: Option<u32>,
    pub mode: Option<AnalysisMode>,
}

#[derive(Debug, Serialize)]
pub struct AnalysisAccepted {
    pub run_id: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// A run's progress together with what was asked for and what it published.
#[derive(Debug, Serialize)]
pub struct RunStatusResponse {
    #[serde(flatten)]
    pub progress: RunProgress,
    pub request: AnalysisRequest,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub report_version: Option<u64>,
    pub content_hash: Option<String>,
}

impl From<&RunState> for RunStatusResponse {
    fn from(state: &RunState) -> Self {
        Self {
            progress: state.progress(),
            request: state.request.clone(),
            created_at: state.created_at,
            started_at: state.started_at,
            finished_at: state.finished_at,
            report_version: state.report_version,
            content_hash: state.content_hash.clone(),
        }
    }
}
