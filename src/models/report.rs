use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use crate::errors::FailureKind;
use super::cost::{ServiceCost, UsageMetric};
use super::partition::Partition;
use super::recommendation::Recommendation;
use super::request::{AnalysisMode, TimeWindow};
use super::run::RunStatus;

/// Why a partition is listed in `partitions_failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionError {
    pub service_id: String,
    pub region_id: String,
    pub kind: FailureKind,
    pub message: String,
    pub attempts: u32,
}

/// The single merged output of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedReport {
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub window: TimeWindow,
    pub mode: AnalysisMode,
    pub currency: String,
    /// `Succeeded` or `Partial`.
    pub status: RunStatus,
    pub total_cost: Decimal,
    pub total_potential_savings: Decimal,
    pub services_analyzed: usize,
    pub partitions_total: usize,
    pub partitions_failed: Vec<Partition>,
    pub errors: Vec<PartitionError>,
    pub top_cost_services: Vec<ServiceCost>,
    pub top_savings: Vec<Recommendation>,
    pub by_service: BTreeMap<String, ServiceCost>,
    pub recommendations: Vec<Recommendation>,
    pub usage: Vec<UsageMetric>,
}

impl ConsolidatedReport {
    pub fn recommendations_count(&self) -> usize {
        self.recommendations.len()
    }

    pub fn is_partial(&self) -> bool {
        !self.partitions_failed.is_empty()
    }
}
