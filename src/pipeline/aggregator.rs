use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::collections::hash_map::Entry;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use crate::errors::CostscopeError;
use crate::models::{
    AnalysisMode, ConsolidatedReport, Partition, PartitionError, PartitionOutcome, Recommendation,
    RunStatus, ServiceCost, TimeWindow, UsageMetric, ALL_REGIONS,
};
use super::results::CompletedPartition;

pub const DEFAULT_TOP_N: usize = 10;

fn add_exact(total: Decimal, amount: Decimal, what: impl FnOnce() -> String) -> Result<Decimal, CostscopeError> {
    total
        .checked_add(amount)
        .ok_or_else(|| CostscopeError::AmountOverflow(format!("{} exceeds the supported decimal range", what())))
}

/// Merges a complete outcome set into one report.
///
/// The result depends only on the set of outcomes, never on the order they
/// are passed in: sums are exact decimals, maps are ordered, and every sort
/// has a total tie-break.
#[derive(Debug, Clone)]
pub struct Aggregator {
    top_n: usize,
    currency: String,
    mode: AnalysisMode,
}

impl Aggregator {
    pub fn new(top_n: usize, currency: impl Into<String>, mode: AnalysisMode) -> Self {
        Self {
            top_n: top_n.max(1),
            currency: currency.into(),
            mode,
        }
    }

    pub fn aggregate(
        &self,
        run_id: &str,
        window: &TimeWindow,
        generated_at: DateTime<Utc>,
        outcomes: &[CompletedPartition],
    ) -> Result<ConsolidatedReport, CostscopeError> {
        let mut cost_by_service: BTreeMap<&str, Decimal> = BTreeMap::new();
        let mut usage: BTreeMap<(&str, &str, &str), Decimal> = BTreeMap::new();
        let mut deduped: HashMap<(&str, &str), &Recommendation> = HashMap::new();
        let mut services_analyzed: BTreeSet<&str> = BTreeSet::new();
        let mut failed: Vec<(&Partition, PartitionError)> = Vec::new();

        for completed in outcomes {
            let data = match &completed.outcome {
                PartitionOutcome::Success(data) => data,
                PartitionOutcome::Failure(failure) => {
                    let partition = &completed.partition;
                    failed.push((partition, PartitionError {
                        service_id: partition.service_id.clone(),
                        region_id: partition.region_id.clone(),
                        kind: failure.kind,
                        message: failure.message.clone(),
                        attempts: failure.attempts,
                    }));
                    continue;
                }
            };

            services_analyzed.insert(completed.partition.service_id.as_str());
            for cost in &data.costs {
                let sum = cost_by_service.entry(cost.service_id.as_str()).or_default();
                *sum = add_exact(*sum, cost.amount, || format!("cost of {}", cost.service_id))?;
            }
            for metric in &data.usage {
                let sum = usage
                    .entry((metric.service_id.as_str(), metric.metric.as_str(), metric.unit.as_str()))
                    .or_default();
                *sum = add_exact(*sum, metric.quantity, || {
                    format!("usage {} of {}", metric.metric, metric.service_id)
                })?;
            }
            for rec in &data.recommendations {
                match deduped.entry((rec.resource_id.as_str(), rec.kind.as_str())) {
                    Entry::Vacant(slot) => {
                        slot.insert(rec);
                    }
                    Entry::Occupied(mut slot) => {
                        if rec.outranks(slot.get()) {
                            slot.insert(rec);
                        }
                    }
                }
            }
        }

        if services_analyzed.is_empty() {
            return Err(CostscopeError::NoDataAvailable(format!(
                "all {} partitions failed",
                outcomes.len()
            )));
        }

        let by_service: BTreeMap<String, ServiceCost> = cost_by_service
            .into_iter()
            .map(|(service, amount)| {
                (service.to_string(), ServiceCost::new(service, ALL_REGIONS, amount, self.currency.as_str()))
            })
            .collect();
        let total_cost = by_service
            .values()
            .try_fold(Decimal::ZERO, |acc, c| add_exact(acc, c.amount, || "total cost".to_string()))?;

        let mut top_cost_services: Vec<ServiceCost> = by_service.values().cloned().collect();
        top_cost_services.sort_by(|a, b| {
            b.amount.cmp(&a.amount).then_with(|| a.service_id.cmp(&b.service_id))
        });
        top_cost_services.truncate(self.top_n);

        let mut recommendations: Vec<Recommendation> = deduped.into_values().cloned().collect();
        recommendations.sort_by(|a, b| a.ranking_cmp(b));
        let total_potential_savings = recommendations
            .iter()
            .try_fold(Decimal::ZERO, |acc, r| add_exact(acc, r.estimated_monthly_savings, || "potential savings".to_string()))?;
        let top_savings: Vec<Recommendation> = recommendations.iter().take(self.top_n).cloned().collect();

        let usage: Vec<UsageMetric> = usage
            .into_iter()
            .map(|((service, metric, unit), quantity)| UsageMetric {
                service_id: service.to_string(),
                region_id: ALL_REGIONS.to_string(),
                metric: metric.to_string(),
                quantity,
                unit: unit.to_string(),
            })
            .collect();

        failed.sort_by_key(|(partition, _)| partition.key());
        let status = if failed.is_empty() { RunStatus::Succeeded } else { RunStatus::Partial };
        let (partitions_failed, errors): (Vec<Partition>, Vec<PartitionError>) = failed
            .into_iter()
            .map(|(partition, error)| (partition.clone(), error))
            .unzip();

        Ok(ConsolidatedReport {
            run_id: run_id.to_string(),
            generated_at,
            window: window.clone(),
            mode: self.mode,
            currency: self.currency.clone(),
            status,
            total_cost,
            total_potential_savings,
            services_analyzed: services_analyzed.len(),
            partitions_total: outcomes.len(),
            partitions_failed,
            errors,
            top_cost_services,
            top_savings,
            by_service,
            recommendations,
            usage,
        })
    }
}
