use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use std::time::Duration;
use crate::collectors::ServiceCatalog;
use crate::config::{
    CostscopeConfig, DEFAULT_CONCURRENCY, DEFAULT_CURRENCY, DEFAULT_MAX_CONCURRENT_RUNS,
    DEFAULT_REGION, DEFAULT_WINDOW_DAYS,
};
use crate::errors::RetryConfig;
use crate::models::{AnalysisMode, AnalysisRequest, RunStatus, ServiceScope, TimeWindow};
use super::aggregator::DEFAULT_TOP_N;
use super::phase::RunPhase;

/// Observable state of one run. Persisted on every terminal transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunState {
    pub run_id: String,
    pub request: AnalysisRequest,
    pub status: RunStatus,
    pub phase: Option<RunPhase>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub partitions_total: usize,
    pub partitions_completed: usize,
    pub partitions_failed: usize,
    pub error: Option<String>,
    /// Set once the report is published.
    pub report_version: Option<u64>,
    pub content_hash: Option<String>,
}

impl RunState {
    pub fn new(run_id: impl Into<String>, request: AnalysisRequest) -> Self {
        Self {
            run_id: run_id.into(),
            request,
            status: RunStatus::Pending,
            phase: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            partitions_total: 0,
            partitions_completed: 0,
            partitions_failed: 0,
            error: None,
            report_version: None,
            content_hash: None,
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        let Some(started) = self.started_at else {
            return 0;
        };
        let end = self.finished_at.unwrap_or_else(Utc::now);
        end.signed_duration_since(started).num_milliseconds().max(0) as u64
    }

    pub fn progress(&self) -> RunProgress {
        RunProgress {
            run_id: self.run_id.clone(),
            status: self.status,
            phase: self.phase,
            elapsed_ms: self.elapsed_ms(),
            partitions_total: self.partitions_total,
            partitions_completed: self.partitions_completed,
            partitions_failed: self.partitions_failed,
            error: self.error.clone(),
        }
    }
}

/// Snapshot returned by status polling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunProgress {
    pub run_id: String,
    pub status: RunStatus,
    pub phase: Option<RunPhase>,
    pub elapsed_ms: u64,
    pub partitions_total: usize,
    pub partitions_completed: usize,
    pub partitions_failed: usize,
    pub error: Option<String>,
}

/// Resolved engine settings: the config file with every default applied.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub concurrency: usize,
    pub currency: String,
    pub default_regions: Vec<String>,
    pub default_window_days: u32,
    pub default_mode: AnalysisMode,
    pub retry: RetryConfig,
    pub top_n: usize,
    pub catalog: ServiceCatalog,
    pub max_concurrent_runs: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            currency: DEFAULT_CURRENCY.to_string(),
            default_regions: vec![DEFAULT_REGION.to_string()],
            default_window_days: DEFAULT_WINDOW_DAYS,
            default_mode: AnalysisMode::Full,
            retry: RetryConfig::default(),
            top_n: DEFAULT_TOP_N,
            catalog: ServiceCatalog::default(),
            max_concurrent_runs: DEFAULT_MAX_CONCURRENT_RUNS,
        }
    }
}

impl EngineConfig {
    pub fn from_config(config: &CostscopeConfig) -> Self {
        let mut engine = Self::default();

        if let Some(analysis) = &config.analysis {
            if let Some(c) = analysis.concurrency {
                engine.concurrency = c;
            }
            if let Some(currency) = &analysis.currency {
                engine.currency = currency.clone();
            }
            if let Some(regions) = &analysis.default_regions {
                engine.default_regions = regions.clone();
            }
            if let Some(days) = analysis.default_window_days {
                engine.default_window_days = days;
            }
            if let Some(mode) = analysis.mode {
                engine.default_mode = mode;
            }
        }

        if let Some(retry) = &config.retry {
            if let Some(n) = retry.max_attempts {
                engine.retry.max_attempts = n;
            }
            if let Some(ms) = retry.base_delay_ms {
                engine.retry.base_delay = Duration::from_millis(ms);
            }
            if let Some(ms) = retry.max_delay_ms {
                engine.retry.max_delay = Duration::from_millis(ms);
            }
            if let Some(ms) = retry.attempt_timeout_ms {
                engine.retry.attempt_timeout = Duration::from_millis(ms);
            }
        }

        if let Some(top_n) = config.report.as_ref().and_then(|r| r.top_n) {
            engine.top_n = top_n;
        }
        if let Some(catalog) = config.services.as_ref().and_then(|s| s.catalog.as_ref()) {
            engine.catalog = ServiceCatalog::from_ids(catalog.iter().cloned());
        }
        engine.max_concurrent_runs = config.max_concurrent_runs();

        engine
    }

    /// Fill the parts of a request the caller left out from the configured defaults.
    pub fn resolve_request(
        &self,
        scope: Option<ServiceScope>,
        regions: Option<Vec<String>>,
        window: Option<TimeWindow>,
        mode: Option<AnalysisMode>,
    ) -> AnalysisRequest {
        AnalysisRequest::new(
            scope.unwrap_or_default(),
            regions.unwrap_or_else(|| self.default_regions.clone()),
            window.unwrap_or_else(|| TimeWindow::last_days(i64::from(self.default_window_days))),
            mode.unwrap_or(self.default_mode),
        )
    }
}
