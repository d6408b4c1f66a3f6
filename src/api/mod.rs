pub mod errors;
pub mod models;
pub mod routes;

use std::sync::Arc;
use axum::routing::{get, post};
use axum::Router;
use dashmap::DashMap;
use tokio::sync::{OwnedSemaphorePermit, RwLock, Semaphore};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use crate::collectors::CollectorRegistry;
use crate::config::CostscopeConfig;
use crate::db::{Database, ReportStore};
use crate::errors::CostscopeError;
use crate::pipeline::{AnalysisEngine, EngineConfig, RunState};

pub use errors::ApiError;

/// Live view of a run the server started, kept until the run reaches a terminal state.
pub struct RunHandle {
    pub state: Arc<RwLock<RunState>>,
    pub cancel_token: CancellationToken,
}

type ActiveRuns = Arc<DashMap<String, Arc<RunHandle>>>;

/// One of the server's concurrent run slots.
///
/// Holds a permit from the run semaphore; once a run is registered the
/// slot also owns its `active_runs` entry. Dropping the slot removes the
/// entry before the permit is returned, so a run that ends in any way
/// (including a panic in its task) frees both.
pub struct RunSlot {
    active_runs: ActiveRuns,
    run_id: Option<String>,
    _permit: OwnedSemaphorePermit,
}

impl RunSlot {
    pub fn register(&mut self, run_id: String, handle: RunHandle) {
        self.active_runs.insert(run_id.clone(), Arc::new(handle));
        self.run_id = Some(run_id);
    }
}

impl Drop for RunSlot {
    fn drop(&mut self) {
        if let Some(run_id) = self.run_id.take() {
            self.active_runs.remove(&run_id);
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<AnalysisEngine>,
    pub store: Arc<dyn ReportStore>,
    pub active_runs: ActiveRuns,
    pub max_concurrent_runs: usize,
    run_slots: Arc<Semaphore>,
}

impl AppState {
    pub fn new(engine: Arc<AnalysisEngine>) -> Self {
        let max_concurrent_runs = engine.config().max_concurrent_runs.max(1);
        Self {
            store: engine.store(),
            engine,
            active_runs: Arc::new(DashMap::new()),
            max_concurrent_runs,
            run_slots: Arc::new(Semaphore::new(max_concurrent_runs)),
        }
    }

    /// Reserve a run slot, or `None` when every slot is taken.
    pub fn try_reserve_run(&self) -> Option<RunSlot> {
        let permit = Arc::clone(&self.run_slots).try_acquire_owned().ok()?;
        Some(RunSlot {
            active_runs: Arc::clone(&self.active_runs),
            run_id: None,
            _permit: permit,
        })
    }
}

pub fn create_app_state(config: &CostscopeConfig) -> Result<AppState, CostscopeError> {
    let db = Database::new(&config.database_path())?;
    let collectors = CollectorRegistry::from_config(config)?;
    let engine = AnalysisEngine::new(EngineConfig::from_config(config), collectors, Arc::new(db));
    Ok(AppState::new(Arc::new(engine)))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(routes::health::health_check))
        .route(
            "/api/analyses",
            post(routes::analyses::create_analysis).get(routes::analyses::list_analyses),
        )
        .route("/api/analyses/{run_id}/status", get(routes::analyses::get_status))
        .route("/api/analyses/{run_id}/cancel", post(routes::analyses::cancel_analysis))
        .route("/api/reports/latest", get(routes::reports::get_latest_report))
        .route("/api/reports/{run_id}", get(routes::reports::get_report))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::FixtureCollector;

    fn state(max_concurrent_runs: usize) -> AppState {
        let config = EngineConfig { max_concurrent_runs, ..EngineConfig::default() };
        let collectors = CollectorRegistry::new()
            .with_default(Arc::new(FixtureCollector::empty()));
        let db = Database::in_memory().unwrap();
        AppState::new(Arc::new(AnalysisEngine::new(config, collectors, Arc::new(db))))
    }

    fn handle(state: &AppState) -> (String, RunHandle) {
        let orchestrator = state.engine.orchestrator(state.engine.config().resolve_request(None, None, None, None));
        let handle = RunHandle { state: orchestrator.state(), cancel_token: orchestrator.cancel_token() };
        (orchestrator.run_id().to_string(), handle)
    }

    #[test]
    fn test_slots_are_capped() {
        let state = state(2);
        let first = state.try_reserve_run();
        let second = state.try_reserve_run();
        assert!(first.is_some() && second.is_some());
        assert!(state.try_reserve_run().is_none());

        drop(first);
        assert!(state.try_reserve_run().is_some());
    }

    #[test]
    fn test_dropping_slot_unregisters_run() {
        let state = state(1);
        let mut slot = state.try_reserve_run().unwrap();
        let (run_id, run) = handle(&state);
        slot.register(run_id.clone(), run);
        assert!(state.active_runs.contains_key(&run_id));
        assert!(state.try_reserve_run().is_none());

        drop(slot);
        assert!(!state.active_runs.contains_key(&run_id));
        assert!(state.try_reserve_run().is_some());
    }

    #[tokio::test]
    async fn test_slot_freed_when_run_task_panics() {
        let state = state(1);
        let mut slot = state.try_reserve_run().unwrap();
        let (run_id, run) = handle(&state);
        slot.register(run_id.clone(), run);

        let task = tokio::spawn(async move {
            let _slot = slot;
            panic!("run task died");
        });
        assert!(task.await.is_err());
        assert!(!state.active_runs.contains_key(&run_id));
        assert!(state.try_reserve_run().is_some());
    }
}
