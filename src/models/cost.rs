use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Region label used for figures that were combined across regions.
pub const ALL_REGIONS: &str = "all";

/// Spend for one service, either in a single region or summed across regions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCost {
    pub service_id: String,
    pub region_id: String,
    pub amount: Decimal,
    pub currency: String,
}

impl ServiceCost {
    pub fn new(
        service_id: impl Into<String>,
        region_id: impl Into<String>,
        amount: Decimal,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            service_id: service_id.into(),
            region_id: region_id.into(),
            amount,
            currency: currency.into(),
        }
    }
}

/// A consumption figure reported alongside costs (hours, GB-months, requests...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageMetric {
    pub service_id: String,
    pub region_id: String,
    pub metric: String,
    pub quantity: Decimal,
    pub unit: String,
}
