use std::sync::Arc;
use std::time::Instant;
use chrono::Utc;
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use crate::collectors::{CollectorRegistry, ServiceCatalog};
use crate::db::{ReportKey, ReportStore};
use crate::errors::{CostscopeError, FailureKind};
use crate::models::{AnalysisRequest, ConsolidatedReport, Partition, PartitionOutcome, RunStatus};
use super::aggregator::Aggregator;
use super::events::RunEvent;
use super::partitioner::partition;
use super::phase::RunPhase;
use super::results::{CompletedPartition, ResultCollector};
use super::state::{EngineConfig, RunProgress, RunState};
use super::worker_pool::WorkerPool;
use tracing::{debug, error, info, warn};

/// What a finished run hands back to its caller.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: String,
    /// `Succeeded`, `Partial`, or `Failed` when the report could not be stored.
    pub status: RunStatus,
    pub report: ConsolidatedReport,
    /// Present once the report is published and "latest" points at it.
    pub key: Option<ReportKey>,
    pub store_error: Option<String>,
}

/// Shared pieces every run of a process uses: one worker pool (and so one
/// concurrency ceiling), one catalog, one report store.
pub struct AnalysisEngine {
    config: EngineConfig,
    pool: Arc<WorkerPool>,
    store: Arc<dyn ReportStore>,
}

impl AnalysisEngine {
    pub fn new(config: EngineConfig, collectors: CollectorRegistry, store: Arc<dyn ReportStore>) -> Self {
        let pool = Arc::new(WorkerPool::new(
            collectors,
            config.concurrency,
            config.retry.clone(),
            config.currency.clone(),
        ));
        Self { config, pool, store }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &ServiceCatalog {
        &self.config.catalog
    }

    pub fn pool(&self) -> Arc<WorkerPool> {
        self.pool.clone()
    }

    pub fn store(&self) -> Arc<dyn ReportStore> {
        self.store.clone()
    }

    /// A fresh orchestrator with a new run id. Nothing runs until `run()`.
    pub fn orchestrator(&self, request: AnalysisRequest) -> AnalysisOrchestrator {
        let run_id = Uuid::new_v4().to_string();
        AnalysisOrchestrator {
            state: Arc::new(RwLock::new(RunState::new(run_id.clone(), request.clone()))),
            run_id,
            request,
            catalog: self.config.catalog.clone(),
            top_n: self.config.top_n,
            pool: self.pool.clone(),
            store: self.store.clone(),
            cancel_token: CancellationToken::new(),
            event_tx: None,
        }
    }
}

/// Drives one request through partition, collect, aggregate and publish.
pub struct AnalysisOrchestrator {
    run_id: String,
    request: AnalysisRequest,
    catalog: ServiceCatalog,
    top_n: usize,
    pool: Arc<WorkerPool>,
    store: Arc<dyn ReportStore>,
    state: Arc<RwLock<RunState>>,
    cancel_token: CancellationToken,
    event_tx: Option<mpsc::UnboundedSender<RunEvent>>,
}

impl AnalysisOrchestrator {
    /// Use a caller-chosen run id instead of a generated one.
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self.state = Arc::new(RwLock::new(RunState::new(self.run_id.clone(), self.request.clone())));
        self
    }

    /// Replace the orchestrator's cancel token with an external one, so that
    /// cancelling the caller's token stops this run.
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    /// Attach an event channel for progress displays.
    pub fn with_event_channel(mut self, tx: mpsc::UnboundedSender<RunEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    fn emit(&self, event: RunEvent) {
        if let Some(ref tx) = self.event_tx {
            let _ = tx.send(event);
        }
    }

    async fn set_phase(&self, phase: RunPhase) {
        self.state.write().await.phase = Some(phase);
        debug!(run_id = %self.run_id, phase = %phase, "Phase started");
        self.emit(RunEvent::PhaseStarted {
            phase,
            display_name: phase.display_name().to_string(),
        });
    }

    fn phase_completed(&self, phase: RunPhase) {
        self.emit(RunEvent::PhaseCompleted {
            phase,
            display_name: phase.display_name().to_string(),
        });
    }

    /// Write the current state to the store. A store outage must not stop the run.
    async fn persist_state(&self) {
        let snapshot = self.state.read().await.clone();
        if let Err(e) = self.store.save_run(&snapshot) {
            warn!(run_id = %self.run_id, error = %e, "Failed to record run state");
        }
    }

    /// Move the run to a failed terminal status and hand the error back.
    async fn fail(&self, status: RunStatus, error: CostscopeError) -> CostscopeError {
        {
            let mut state = self.state.write().await;
            state.status = status;
            state.error = Some(error.to_string());
            state.finished_at = Some(Utc::now());
        }
        self.persist_state().await;
        warn!(run_id = %self.run_id, status = %status, error = %error, "Run failed");
        self.emit(RunEvent::RunFailed {
            status,
            error: error.to_string(),
        });
        error
    }

    async fn check_cancelled(&self) -> Result<(), CostscopeError> {
        if self.cancel_token.is_cancelled() {
            info!(run_id = %self.run_id, "Run cancelled by caller");
            Err(self
                .fail(RunStatus::Cancelled, CostscopeError::Cancelled("run cancelled by caller".into()))
                .await)
        } else {
            Ok(())
        }
    }

    /// Execute the run to a terminal state.
    ///
    /// Returns `Err` when no report was produced (rejected request, every
    /// partition failed, or cancellation). A report that could not be stored
    /// comes back as `Ok` with status `Failed` and `store_error` set.
    pub async fn run(&self) -> Result<RunReport, CostscopeError> {
        let started = Instant::now();
        {
            let mut state = self.state.write().await;
            state.status = RunStatus::Running;
            state.started_at = Some(Utc::now());
        }
        self.persist_state().await;

        self.set_phase(RunPhase::Partitioning).await;
        let partitions = match partition(&self.request, &self.catalog) {
            Ok(p) => p,
            Err(e) => return Err(self.fail(RunStatus::Failed, e).await),
        };
        self.state.write().await.partitions_total = partitions.len();
        info!(
            run_id = %self.run_id,
            partitions = partitions.len(),
            regions = self.request.regions.len(),
            window = %self.request.window,
            mode = %self.request.mode,
            "Run started"
        );
        self.emit(RunEvent::RunStarted {
            run_id: self.run_id.clone(),
            partitions: partitions.len(),
        });
        self.phase_completed(RunPhase::Partitioning);

        self.set_phase(RunPhase::Collecting).await;
        let outcomes = self.collect(partitions).await?;
        self.phase_completed(RunPhase::Collecting);

        self.set_phase(RunPhase::Aggregating).await;
        let aggregator = Aggregator::new(self.top_n, self.pool.currency(), self.request.mode);
        let report = match aggregator.aggregate(&self.run_id, &self.request.window, Utc::now(), &outcomes) {
            Ok(report) => report,
            Err(e) => return Err(self.fail(RunStatus::Failed, e).await),
        };
        self.phase_completed(RunPhase::Aggregating);

        self.check_cancelled().await?;

        self.set_phase(RunPhase::Persisting).await;
        let duration_ms = started.elapsed().as_millis() as u64;
        match self.store.publish(&report) {
            Ok(key) => {
                {
                    let mut state = self.state.write().await;
                    state.status = report.status;
                    state.finished_at = Some(Utc::now());
                    state.report_version = Some(key.version);
                    state.content_hash = Some(key.content_hash.clone());
                }
                self.persist_state().await;
                self.phase_completed(RunPhase::Persisting);
                info!(
                    run_id = %self.run_id,
                    status = %report.status,
                    total_cost = %report.total_cost,
                    savings = %report.total_potential_savings,
                    failed = report.partitions_failed.len(),
                    version = key.version,
                    duration_ms,
                    "Run completed"
                );
                self.emit(RunEvent::RunCompleted {
                    status: report.status,
                    total_cost: report.total_cost,
                    total_potential_savings: report.total_potential_savings,
                    partitions_failed: report.partitions_failed.len(),
                    duration_ms,
                });
                Ok(RunReport {
                    run_id: self.run_id.clone(),
                    status: report.status,
                    report,
                    key: Some(key),
                    store_error: None,
                })
            }
            Err(e) => {
                error!(run_id = %self.run_id, error = %e, "Report could not be published");
                let message = e.to_string();
                self.fail(RunStatus::Failed, e).await;
                Ok(RunReport {
                    run_id: self.run_id.clone(),
                    status: RunStatus::Failed,
                    report,
                    key: None,
                    store_error: Some(message),
                })
            }
        }
    }

    /// Fan out every partition and wait at the single barrier for all outcomes.
    async fn collect(
        &self,
        partitions: Vec<Partition>,
    ) -> Result<Vec<CompletedPartition>, CostscopeError> {
        let mode = self.request.mode;
        let (tx, mut rx) = mpsc::channel::<CompletedPartition>(self.pool.concurrency() * 2);
        let handles: Vec<JoinHandle<()>> = partitions
            .iter()
            .cloned()
            .map(|p| self.pool.submit(p, mode, tx.clone(), self.cancel_token.clone()))
            .collect();
        drop(tx);

        let mut results = ResultCollector::new(partitions);
        while !results.is_complete() {
            let received = tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => None,
                msg = rx.recv() => msg,
            };
            let Some(completed) = received else {
                break;
            };

            let label = completed.partition.to_string();
            let failure: Option<FailureKind> = match &completed.outcome {
                PartitionOutcome::Success(_) => None,
                PartitionOutcome::Failure(f) => Some(f.kind),
            };
            if results.record(completed).is_err() {
                continue;
            }

            {
                let mut state = self.state.write().await;
                state.partitions_completed = results.completed();
                state.partitions_failed = results.failed();
            }
            self.emit(RunEvent::PartitionCompleted {
                partition: label,
                success: failure.is_none(),
                failure,
            });
        }

        if self.cancel_token.is_cancelled() {
            for handle in &handles {
                handle.abort();
            }
            // Outcomes still in flight are discarded with the receiver.
            drop(rx);
            self.check_cancelled().await?;
        }

        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                if e.is_panic() {
                    error!(run_id = %self.run_id, error = %e, "Partition task panicked");
                }
            }
        }

        match results.finish() {
            Ok(outcomes) => Ok(outcomes),
            Err(e) => Err(self.fail(RunStatus::Failed, e).await),
        }
    }

    /// Snapshot for status polling. Never waits on collector calls.
    pub async fn progress(&self) -> RunProgress {
        self.state.read().await.progress()
    }

    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn request(&self) -> &AnalysisRequest {
        &self.request
    }

    pub fn state(&self) -> Arc<RwLock<RunState>> {
        self.state.clone()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }
}
