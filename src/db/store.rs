use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use crate::errors::CostscopeError;
use crate::models::ConsolidatedReport;
use crate::pipeline::state::RunState;
use crate::reporting::PersistedReport;
use super::Database;

/// Identity of a published report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportKey {
    pub run_id: String,
    /// Publish sequence number within the store, starting at 1.
    pub version: u64,
    /// SHA-256 of the persisted JSON document.
    pub content_hash: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredReport {
    pub key: ReportKey,
    pub report: ConsolidatedReport,
    /// The exact JSON document `content_hash` was computed over.
    pub document_json: String,
    pub published_at: DateTime<Utc>,
}

impl StoredReport {
    pub fn document(&self) -> Result<PersistedReport, CostscopeError> {
        Ok(serde_json::from_str(&self.document_json)?)
    }
}

/// Durable home of published reports, the "latest" pointer, and run states.
///
/// `publish` stores a report and moves "latest" to it in one step, so readers
/// observe either the previous report or the new one and never a mix.
pub trait ReportStore: Send + Sync {
    fn publish(&self, report: &ConsolidatedReport) -> Result<ReportKey, CostscopeError>;

    /// Point "latest" at an already published report. Idempotent.
    fn replace_latest(&self, run_id: &str) -> Result<ReportKey, CostscopeError>;

    fn latest(&self) -> Result<Option<StoredReport>, CostscopeError>;

    fn get_report(&self, run_id: &str) -> Result<Option<StoredReport>, CostscopeError>;

    fn save_run(&self, state: &RunState) -> Result<(), CostscopeError>;

    fn get_run(&self, run_id: &str) -> Result<Option<RunState>, CostscopeError>;

    /// Most recent first.
    fn list_runs(&self, limit: usize, offset: usize) -> Result<Vec<RunState>, CostscopeError>;
}

/// Serialize the persisted document and hash it.
pub fn render_document(report: &ConsolidatedReport) -> Result<(String, String), CostscopeError> {
    if !report.status.is_publishable() {
        return Err(CostscopeError::Internal(format!(
            "refusing to publish report for run {} with status {}",
            report.run_id, report.status
        )));
    }
    let json = serde_json::to_string(&PersistedReport::from(report))?;
    let hash = content_hash(&json);
    Ok((json, hash))
}

pub fn content_hash(document_json: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(document_json.as_bytes());
    hex::encode(hasher.finalize())
}

fn unavailable(e: CostscopeError) -> CostscopeError {
    match e {
        CostscopeError::Database(msg) => CostscopeError::StoreUnavailable(msg),
        other => other,
    }
}

impl ReportStore for Database {
    fn publish(&self, report: &ConsolidatedReport) -> Result<ReportKey, CostscopeError> {
        self.publish_report(report).map_err(unavailable)
    }

    fn replace_latest(&self, run_id: &str) -> Result<ReportKey, CostscopeError> {
        self.set_latest(run_id).map_err(unavailable)
    }

    fn latest(&self) -> Result<Option<StoredReport>, CostscopeError> {
        self.latest_report().map_err(unavailable)
    }

    fn get_report(&self, run_id: &str) -> Result<Option<StoredReport>, CostscopeError> {
        self.load_report(run_id).map_err(unavailable)
    }

    fn save_run(&self, state: &RunState) -> Result<(), CostscopeError> {
        self.upsert_run(state).map_err(unavailable)
    }

    fn get_run(&self, run_id: &str) -> Result<Option<RunState>, CostscopeError> {
        self.load_run(run_id).map_err(unavailable)
    }

    fn list_runs(&self, limit: usize, offset: usize) -> Result<Vec<RunState>, CostscopeError> {
        self.load_runs(limit, offset).map_err(unavailable)
    }
}

/// In-process store. "latest" is a single `Arc` swapped under a write lock.
#[derive(Default)]
pub struct MemoryReportStore {
    reports: RwLock<HashMap<String, Arc<StoredReport>>>,
    latest: RwLock<Option<Arc<StoredReport>>>,
    runs: RwLock<HashMap<String, RunState>>,
}

fn poisoned<T>(_: T) -> CostscopeError {
    CostscopeError::StoreUnavailable("memory store lock poisoned".into())
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReportStore for MemoryReportStore {
    fn publish(&self, report: &ConsolidatedReport) -> Result<ReportKey, CostscopeError> {
        let (document_json, hash) = render_document(report)?;
        let mut reports = self.reports.write().map_err(poisoned)?;

        if let Some(existing) = reports.get(&report.run_id) {
            if existing.key.content_hash == hash {
                let existing = Arc::clone(existing);
                *self.latest.write().map_err(poisoned)? = Some(Arc::clone(&existing));
                return Ok(existing.key.clone());
            }
        }

        let version = reports.values().map(|r| r.key.version).max().unwrap_or(0) + 1;
        let stored = Arc::new(StoredReport {
            key: ReportKey {
                run_id: report.run_id.clone(),
                version,
                content_hash: hash,
            },
            report: report.clone(),
            document_json,
            published_at: Utc::now(),
        });
        reports.insert(report.run_id.clone(), Arc::clone(&stored));
        *self.latest.write().map_err(poisoned)? = Some(Arc::clone(&stored));
        Ok(stored.key.clone())
    }

    fn replace_latest(&self, run_id: &str) -> Result<ReportKey, CostscopeError> {
        let reports = self.reports.read().map_err(poisoned)?;
        let stored = reports
            .get(run_id)
            .ok_or_else(|| CostscopeError::RunNotFound(run_id.to_string()))?;
        *self.latest.write().map_err(poisoned)? = Some(Arc::clone(stored));
        Ok(stored.key.clone())
    }

    fn latest(&self) -> Result<Option<StoredReport>, CostscopeError> {
        Ok(self.latest.read().map_err(poisoned)?.as_deref().cloned())
    }

    fn get_report(&self, run_id: &str) -> Result<Option<StoredReport>, CostscopeError> {
        Ok(self.reports.read().map_err(poisoned)?.get(run_id).map(|r| (**r).clone()))
    }

    fn save_run(&self, state: &RunState) -> Result<(), CostscopeError> {
        self.runs
            .write()
            .map_err(poisoned)?
            .insert(state.run_id.clone(), state.clone());
        Ok(())
    }

    fn get_run(&self, run_id: &str) -> Result<Option<RunState>, CostscopeError> {
        Ok(self.runs.read().map_err(poisoned)?.get(run_id).cloned())
    }

    fn list_runs(&self, limit: usize, offset: usize) -> Result<Vec<RunState>, CostscopeError> {
        let runs = self.runs.read().map_err(poisoned)?;
        let mut all: Vec<&RunState> = runs.values().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.run_id.cmp(&a.run_id)));
        Ok(all.into_iter().skip(offset).take(limit).cloned().collect())
    }
}
