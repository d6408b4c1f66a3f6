use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use crate::errors::{CostscopeError, FailureKind};
use super::cost::{ServiceCost, UsageMetric};
use super::recommendation::Recommendation;
use super::request::AnalysisMode;

/// Raw data a collector returns for one partition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectedData {
    #[serde(default)]
    pub costs: Vec<ServiceCost>,
    #[serde(default)]
    pub usage: Vec<UsageMetric>,
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
}

impl CollectedData {
    /// Check the collector contract: one currency, non-negative savings.
    ///
    /// Negative cost amounts are allowed (credits and refunds show up that way).
    pub fn validate(&self, currency: &str) -> Result<(), CostscopeError> {
        if let Some(cost) = self.costs.iter().find(|c| !c.currency.eq_ignore_ascii_case(currency)) {
            return Err(CostscopeError::CurrencyMismatch(format!(
                "{}@{} reported {} but the run is denominated in {}",
                cost.service_id, cost.region_id, cost.currency, currency
            )));
        }
        if let Some(rec) = self.recommendations.iter().find(|r| r.estimated_monthly_savings < Decimal::ZERO) {
            return Err(CostscopeError::InvalidPayload(format!(
                "recommendation {}/{} has negative savings {}",
                rec.resource_id, rec.kind, rec.estimated_monthly_savings
            )));
        }
        if let Some(rec) = self.recommendations.iter().find(|r| r.resource_id.is_empty() || r.kind.is_empty()) {
            return Err(CostscopeError::InvalidPayload(format!(
                "recommendation for {}@{} is missing a resource id or kind",
                rec.service_id, rec.region_id
            )));
        }
        Ok(())
    }

    /// Drop the parts of the payload the analysis mode does not ask for.
    pub fn restrict(mut self, mode: AnalysisMode) -> Self {
        if !mode.includes_costs() {
            self.costs.clear();
            self.usage.clear();
        }
        if !mode.includes_recommendations() {
            self.recommendations.clear();
        }
        self
    }

    /// Sum of the cost amounts, or `None` if it leaves the decimal range.
    pub fn total_cost(&self) -> Option<Decimal> {
        self.costs.iter().try_fold(Decimal::ZERO, |acc, c| acc.checked_add(c.amount))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionFailure {
    pub kind: FailureKind,
    pub message: String,
    /// Whether a later run could reasonably succeed for this partition.
    pub retriable: bool,
    pub attempts: u32,
}

impl PartitionFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>, retriable: bool, attempts: u32) -> Self {
        Self {
            kind,
            message: message.into(),
            retriable,
            attempts,
        }
    }
}

/// Result of executing one partition. Exactly one per partition per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PartitionOutcome {
    Success(CollectedData),
    Failure(PartitionFailure),
}

impl PartitionOutcome {
    pub fn failure(kind: FailureKind, message: impl Into<String>, retriable: bool, attempts: u32) -> Self {
        Self::Failure(PartitionFailure::new(kind, message, retriable, attempts))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::recommendation::Priority;
    use rust_decimal::dec;

    fn sample() -> CollectedData {
        CollectedData {
            costs: vec![ServiceCost::new("ec2", "us-east-1", dec!(120.50), "USD")],
            usage: vec![UsageMetric {
                service_id: "ec2".into(),
                region_id: "us-east-1".into(),
                metric: "instance-hours".into(),
                quantity: dec!(744),
                unit: "Hrs".into(),
            }],
            recommendations: vec![Recommendation {
                resource_id: "i-1".into(),
                service_id: "ec2".into(),
                region_id: "us-east-1".into(),
                kind: "rightsizing".into(),
                estimated_monthly_savings: dec!(30),
                priority: Priority::High,
                finding: "CPU below 5%".into(),
            }],
        }
    }

    #[test]
    fn test_validate_accepts_matching_currency() {
        assert!(sample().validate("USD").is_ok());
        assert!(sample().validate("usd").is_ok());
    }

    #[test]
    fn test_validate_rejects_foreign_currency() {
        let err = sample().validate("EUR").unwrap_err();
        assert!(matches!(err, CostscopeError::CurrencyMismatch(_)));
    }

    #[test]
    fn test_validate_rejects_negative_savings() {
        let mut data = sample();
        data.recommendations[0].estimated_monthly_savings = dec!(-1);
        assert!(matches!(data.validate("USD"), Err(CostscopeError::InvalidPayload(_))));
    }

    #[test]
    fn test_restrict_costs_only() {
        let data = sample().restrict(AnalysisMode::CostsOnly);
        assert_eq!(data.costs.len(), 1);
        assert_eq!(data.usage.len(), 1);
        assert!(data.recommendations.is_empty());
    }

    #[test]
    fn test_restrict_recommendations_only() {
        let data = sample().restrict(AnalysisMode::RecommendationsOnly);
        assert!(data.costs.is_empty());
        assert!(data.usage.is_empty());
        assert_eq!(data.recommendations.len(), 1);
    }

    #[test]
    fn test_outcome_tagged_serialization() {
        let outcome = PartitionOutcome::failure(FailureKind::Timeout, "slow", true, 3);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "failure");
        assert_eq!(json["kind"], "TIMEOUT");
        assert_eq!(json["attempts"], 3);
    }
}
