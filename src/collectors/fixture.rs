use std::collections::HashMap;
use std::path::Path;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use tracing::{debug, info};
use crate::errors::CostscopeError;
use crate::models::{CollectedData, PartitionKey, TimeWindow};
use super::collector::Collector;

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum FixtureErrorKind {
    Throttled,
    Timeout,
    Network,
    ServiceUnavailable,
    PermissionDenied,
    UnsupportedRegion,
    UnknownService,
    InvalidPayload,
}

#[derive(Debug, Clone, Deserialize)]
struct FixtureError {
    kind: FixtureErrorKind,
    #[serde(default)]
    message: Option<String>,
}

impl FixtureError {
    fn to_error(&self, key: &PartitionKey) -> CostscopeError {
        let message = self
            .message
            .clone()
            .unwrap_or_else(|| format!("scripted failure for {}", key));
        match self.kind {
            FixtureErrorKind::Throttled => CostscopeError::Throttled(message),
            FixtureErrorKind::Timeout => CostscopeError::Timeout(message),
            FixtureErrorKind::Network => CostscopeError::Network(message),
            FixtureErrorKind::ServiceUnavailable => CostscopeError::ServiceUnavailable(message),
            FixtureErrorKind::PermissionDenied => CostscopeError::PermissionDenied(message),
            FixtureErrorKind::UnsupportedRegion => CostscopeError::UnsupportedRegion(message),
            FixtureErrorKind::UnknownService => CostscopeError::UnknownService(message),
            FixtureErrorKind::InvalidPayload => CostscopeError::InvalidPayload(message),
        }
    }
}

/// Fails `transient_attempts` times (or forever when absent), then returns `then`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScriptedFailure {
    error: FixtureError,
    #[serde(default)]
    transient_attempts: Option<u32>,
    #[serde(default)]
    then: Option<CollectedData>,
}

/// Both shapes reject unknown keys, so a misspelled key fails to load
/// instead of matching as an empty payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum FixtureEntry {
    Scripted(ScriptedFailure),
    Payload(CollectedData),
}

/// Collector backed by a JSON file keyed by `service@region`.
///
/// Lets the CLI and the HTTP server run end to end without cloud credentials.
/// Partitions missing from the file return an empty payload.
pub struct FixtureCollector {
    entries: HashMap<PartitionKey, FixtureEntry>,
    calls: DashMap<PartitionKey, u32>,
}

impl FixtureCollector {
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
            calls: DashMap::new(),
        }
    }

    pub fn from_json(content: &str) -> Result<Self, CostscopeError> {
        let raw: HashMap<String, FixtureEntry> = serde_json::from_str(content)?;
        let mut entries = HashMap::with_capacity(raw.len());
        for (key, entry) in raw {
            let parsed = PartitionKey::parse(&key).ok_or_else(|| {
                CostscopeError::Config(format!(
                    "Fixture key '{}' is not of the form service@region", key
                ))
            })?;
            entries.insert(parsed, entry);
        }
        Ok(Self {
            entries,
            calls: DashMap::new(),
        })
    }

    pub fn load(path: &Path) -> Result<Self, CostscopeError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CostscopeError::Config(format!("Cannot read fixture {}: {}", path.display(), e))
        })?;
        let collector = Self::from_json(&content)?;
        info!(path = %path.display(), partitions = collector.entries.len(), "Loaded collector fixture");
        Ok(collector)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// How many times `collect` was called for a partition.
    pub fn calls(&self, service_id: &str, region_id: &str) -> u32 {
        self.calls
            .get(&PartitionKey::new(service_id, region_id))
            .map(|c| *c)
            .unwrap_or(0)
    }
}

#[async_trait]
impl Collector for FixtureCollector {
    async fn collect(
        &self,
        service_id: &str,
        region_id: &str,
        window: &TimeWindow,
    ) -> Result<CollectedData, CostscopeError> {
        let key = PartitionKey::new(service_id, region_id);
        let attempt = {
            let mut count = self.calls.entry(key.clone()).or_insert(0);
            *count += 1;
            *count
        };
        debug!(partition = %key, attempt, window = %window, "Fixture collect");

        match self.entries.get(&key) {
            None => Ok(CollectedData::default()),
            Some(FixtureEntry::Payload(data)) => Ok(data.clone()),
            Some(FixtureEntry::Scripted(script)) => match script.transient_attempts {
                Some(n) if attempt > n => Ok(script.then.clone().unwrap_or_default()),
                _ => Err(script.error.to_error(&key)),
            },
        }
    }

    fn name(&self) -> &str {
        "fixture"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::dec;

    fn window() -> TimeWindow {
        TimeWindow::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        )
    }

    const FIXTURE: &str = r#"{
        "ec2@us-east-1": {
            "costs": [{"service_id": "ec2", "region_id": "us-east-1", "amount": 100.25, "currency": "USD"}]
        },
        "s3@us-east-1": {
            "error": {"kind": "throttled", "message": "Rate exceeded"},
            "transient_attempts": 2,
            "then": {"costs": [{"service_id": "s3", "region_id": "us-east-1", "amount": 5, "currency": "USD"}]}
        },
        "rds@eu-west-1": {
            "error": {"kind": "permission_denied"}
        }
    }"#;

    #[tokio::test]
    async fn test_payload_entry() {
        let collector = FixtureCollector::from_json(FIXTURE).unwrap();
        let data = collector.collect("ec2", "us-east-1", &window()).await.unwrap();
        assert_eq!(data.total_cost(), Some(dec!(100.25)));
        assert_eq!(collector.calls("ec2", "us-east-1"), 1);
    }

    #[tokio::test]
    async fn test_transient_then_success() {
        let collector = FixtureCollector::from_json(FIXTURE).unwrap();
        for _ in 0..2 {
            let err = collector.collect("s3", "us-east-1", &window()).await.unwrap_err();
            assert!(matches!(err, CostscopeError::Throttled(_)));
        }
        let data = collector.collect("s3", "us-east-1", &window()).await.unwrap();
        assert_eq!(data.total_cost(), Some(dec!(5)));
    }

    #[tokio::test]
    async fn test_permanent_error_repeats() {
        let collector = FixtureCollector::from_json(FIXTURE).unwrap();
        for _ in 0..3 {
            let err = collector.collect("rds", "eu-west-1", &window()).await.unwrap_err();
            assert!(matches!(err, CostscopeError::PermissionDenied(_)));
        }
    }

    #[tokio::test]
    async fn test_unlisted_partition_is_empty() {
        let collector = FixtureCollector::from_json(FIXTURE).unwrap();
        let data = collector.collect("lambda", "us-west-2", &window()).await.unwrap();
        assert_eq!(data, CollectedData::default());
    }

    #[test]
    fn test_rejects_malformed_key() {
        let err = FixtureCollector::from_json(r#"{"ec2": {}}"#).err().unwrap();
        assert!(matches!(err, CostscopeError::Config(_)));
    }

    #[test]
    fn test_rejects_misspelled_keys() {
        for fixture in [
            r#"{"ec2@us-east-1": {"cost": [{"service_id": "ec2", "region_id": "us-east-1", "amount": 1, "currency": "USD"}]}}"#,
            r#"{"ec2@us-east-1": {"costs": [], "recomendations": []}}"#,
            r#"{"ec2@us-east-1": {"error": {"kind": "throttled"}, "transient_attemps": 2}}"#,
        ] {
            assert!(FixtureCollector::from_json(fixture).is_err(), "accepted {}", fixture);
        }
    }

    #[tokio::test]
    async fn test_empty_entry_is_still_an_empty_payload() {
        let collector = FixtureCollector::from_json(r#"{"ec2@us-east-1": {}}"#).unwrap();
        let data = collector.collect("ec2", "us-east-1", &window()).await.unwrap();
        assert_eq!(data, CollectedData::default());
    }
}
