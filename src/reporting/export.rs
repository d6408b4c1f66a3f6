use std::collections::BTreeMap;
use std::path::Path;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use crate::errors::CostscopeError;
use crate::models::{
    AnalysisMode, ConsolidatedReport, PartitionError, Recommendation, RunStatus, UsageMetric,
};

/// The externally parsed report document. Field names are a stable contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedReport {
    /// `"success"` or `"partial"`
    pub status: String,
    pub metadata: ReportMetadata,
    pub details: ReportDetails,
    pub summary: ReportSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub mode: AnalysisMode,
    pub partitions_total: usize,
    pub failed_partitions: Vec<PartitionError>,
    pub engine_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDetails {
    pub costs: CostDetails,
    pub recommendations: Vec<Recommendation>,
    pub top_savings: Vec<Recommendation>,
    pub usage: Vec<UsageMetric>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostDetails {
    pub total: Decimal,
    pub currency: String,
    pub by_service: BTreeMap<String, Decimal>,
    pub top_services: Vec<ServiceAmount>,
    pub period: Period,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceAmount {
    pub service_id: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_cost: Decimal,
    pub total_savings_potential: Decimal,
    pub services_analyzed: usize,
    pub recommendations_count: usize,
    pub partitions_failed: usize,
}

impl From<&ConsolidatedReport> for PersistedReport {
    fn from(report: &ConsolidatedReport) -> Self {
        let status = match report.status {
            RunStatus::Partial => "partial",
            _ => "success",
        };
        Self {
            status: status.to_string(),
            metadata: ReportMetadata {
                run_id: report.run_id.clone(),
                generated_at: report.generated_at,
                mode: report.mode,
                partitions_total: report.partitions_total,
                failed_partitions: report.errors.clone(),
                engine_version: env!("CARGO_PKG_VERSION").to_string(),
            },
            details: ReportDetails {
                costs: CostDetails {
                    total: report.total_cost,
                    currency: report.currency.clone(),
                    by_service: report
                        .by_service
                        .iter()
                        .map(|(id, cost)| (id.clone(), cost.amount))
                        .collect(),
                    top_services: report
                        .top_cost_services
                        .iter()
                        .map(|c| ServiceAmount { service_id: c.service_id.clone(), amount: c.amount })
                        .collect(),
                    period: Period {
                        start: report.window.start,
                        end: report.window.end,
                    },
                },
                recommendations: report.recommendations.clone(),
                top_savings: report.top_savings.clone(),
                usage: report.usage.clone(),
            },
            summary: ReportSummary {
                total_cost: report.total_cost,
                total_savings_potential: report.total_potential_savings,
                services_analyzed: report.services_analyzed,
                recommendations_count: report.recommendations_count(),
                partitions_failed: report.partitions_failed.len(),
            },
        }
    }
}

impl PersistedReport {
    pub fn to_json_pretty(&self) -> Result<String, CostscopeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Atomic file write: write to temp, then rename
pub async fn atomic_write(path: &Path, content: &str) -> Result<(), CostscopeError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, content).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Write the persisted form of `report` to `path` as pretty JSON.
pub async fn export_report(report: &ConsolidatedReport, path: &Path) -> Result<(), CostscopeError> {
    let json = PersistedReport::from(report).to_json_pretty()?;
    atomic_write(path, &json).await
}
