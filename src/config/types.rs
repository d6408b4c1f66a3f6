use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use crate::models::AnalysisMode;

pub const DEFAULT_CONCURRENCY: usize = 10;
pub const DEFAULT_CURRENCY: &str = "USD";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_WINDOW_DAYS: u32 = 30;
pub const DEFAULT_DATABASE: &str = "./data/costscope.db";
pub const DEFAULT_MAX_CONCURRENT_RUNS: usize = 2;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct CostscopeConfig {
    pub analysis: Option<AnalysisConfig>,
    pub retry: Option<RetrySettings>,
    pub report: Option<ReportConfig>,
    pub storage: Option<StorageConfig>,
    pub services: Option<ServicesConfig>,
    pub collector: Option<CollectorConfig>,
    pub server: Option<ServerConfig>,
}

impl CostscopeConfig {
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .as_ref()
            .and_then(|s| s.database.as_deref())
            .unwrap_or(DEFAULT_DATABASE)
            .into()
    }

    pub fn fixture_path(&self) -> Option<PathBuf> {
        self.collector
            .as_ref()
            .and_then(|c| c.fixture.as_deref())
            .map(PathBuf::from)
    }

    pub fn max_concurrent_runs(&self) -> usize {
        self.server
            .as_ref()
            .and_then(|s| s.max_concurrent_runs)
            .unwrap_or(DEFAULT_MAX_CONCURRENT_RUNS)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AnalysisConfig {
    /// Ceiling on collector calls in flight.
    pub concurrency: Option<usize>,
    pub currency: Option<String>,
    pub default_regions: Option<Vec<String>>,
    pub default_window_days: Option<u32>,
    pub mode: Option<AnalysisMode>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RetrySettings {
    pub max_attempts: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
    pub attempt_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ReportConfig {
    pub top_n: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct StorageConfig {
    pub database: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ServicesConfig {
    /// Replaces the built-in catalog used to expand `scope = all`.
    pub catalog: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct CollectorConfig {
    pub fixture: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub max_concurrent_runs: Option<usize>,
}
