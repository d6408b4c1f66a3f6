use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Lower values are more urgent. High = 0, Medium = 1, Low = 2.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
            Priority::Low => "LOW",
        }
    }
}

/// An optimization opportunity for a single resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub resource_id: String,
    pub service_id: String,
    pub region_id: String,
    /// e.g. "rightsizing", "idle", "reserved-capacity"
    pub kind: String,
    pub estimated_monthly_savings: Decimal,
    pub priority: Priority,
    pub finding: String,
}

impl Recommendation {
    /// De-duplication identity: the same advice for the same resource.
    pub fn identity(&self) -> (String, String) {
        (self.resource_id.clone(), self.kind.clone())
    }

    /// Whether `self` should replace `incumbent` when both share an identity.
    ///
    /// Higher savings always win. Equal savings fall back to a fixed ordering on
    /// the remaining fields so the survivor never depends on arrival order.
    pub fn outranks(&self, incumbent: &Recommendation) -> bool {
        match self.estimated_monthly_savings.cmp(&incumbent.estimated_monthly_savings) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => {
                (&self.region_id, &self.service_id, self.priority.rank(), &self.finding)
                    < (&incumbent.region_id, &incumbent.service_id, incumbent.priority.rank(), &incumbent.finding)
            }
        }
    }

    /// Ranking order: savings descending, then resource id and kind ascending.
    pub fn ranking_cmp(&self, other: &Recommendation) -> Ordering {
        other
            .estimated_monthly_savings
            .cmp(&self.estimated_monthly_savings)
            .then_with(|| self.resource_id.cmp(&other.resource_id))
            .then_with(|| self.kind.cmp(&other.kind))
    }
}
