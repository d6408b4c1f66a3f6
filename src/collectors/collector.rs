use async_trait::async_trait;
use crate::errors::CostscopeError;
use crate::models::{CollectedData, TimeWindow};

/// Per-service data retrieval capability.
///
/// Implementations report transient problems as `Throttled`, `Timeout`,
/// `Network` or `ServiceUnavailable` so the worker pool retries them, and
/// anything else (`PermissionDenied`, `UnsupportedRegion`...) as permanent.
/// All cost amounts must be in the run's currency.
#[async_trait]
pub trait Collector: Send + Sync {
    async fn collect(
        &self,
        service_id: &str,
        region_id: &str,
        window: &TimeWindow,
    ) -> Result<CollectedData, CostscopeError>;

    /// Collector name for logging
    fn name(&self) -> &str;
}
