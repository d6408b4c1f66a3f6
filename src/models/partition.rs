use serde::{Deserialize, Serialize};
use super::request::TimeWindow;

/// The smallest independently executable unit: one service, one region, one window.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Partition {
    pub service_id: String,
    pub region_id: String,
    pub window: TimeWindow,
}

impl Partition {
    pub fn new(service_id: impl Into<String>, region_id: impl Into<String>, window: TimeWindow) -> Self {
        Self {
            service_id: service_id.into(),
            region_id: region_id.into(),
            window,
        }
    }

    pub fn key(&self) -> PartitionKey {
        PartitionKey {
            service_id: self.service_id.clone(),
            region_id: self.region_id.clone(),
        }
    }
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.service_id, self.region_id)
    }
}

/// Partition identity within a run. Ordered by service, then region.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartitionKey {
    pub service_id: String,
    pub region_id: String,
}

impl PartitionKey {
    pub fn new(service_id: impl Into<String>, region_id: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            region_id: region_id.into(),
        }
    }

    /// Parse `service@region`.
    pub fn parse(value: &str) -> Option<Self> {
        let (service, region) = value.split_once('@')?;
        if service.is_empty() || region.is_empty() {
            return None;
        }
        Some(Self::new(service, region))
    }
}

impl std::fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.service_id, self.region_id)
    }
}
