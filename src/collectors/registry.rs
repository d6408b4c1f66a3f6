use std::collections::{HashMap, HashSet};
use std::sync::{Arc, LazyLock};
use serde::{Deserialize, Serialize};
use tracing::warn;
use crate::config::CostscopeConfig;
use crate::errors::CostscopeError;
use super::collector::Collector;
use super::fixture::FixtureCollector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceCategory {
    Compute,
    Storage,
    Database,
    Networking,
    Analytics,
    Integration,
    Management,
    Security,
    MachineLearning,
}

pub struct ServiceDefinition {
    pub id: &'static str,
    pub display_name: &'static str,
    pub category: ServiceCategory,
}

macro_rules! service {
    ($id:literal, $name:literal, $cat:ident) => {
        ServiceDefinition { id: $id, display_name: $name, category: ServiceCategory::$cat }
    };
}

/// Services expanded by `scope = all` unless the configuration supplies its own list.
pub static SERVICE_CATALOG: LazyLock<Vec<ServiceDefinition>> = LazyLock::new(|| vec![
    service!("ec2", "Elastic Compute Cloud", Compute),
    service!("lambda", "Lambda", Compute),
    service!("ecs", "Elastic Container Service", Compute),
    service!("eks", "Elastic Kubernetes Service", Compute),
    service!("batch", "Batch", Compute),
    service!("s3", "Simple Storage Service", Storage),
    service!("ebs", "Elastic Block Store", Storage),
    service!("efs", "Elastic File System", Storage),
    service!("backup", "Backup", Storage),
    service!("rds", "Relational Database Service", Database),
    service!("dynamodb", "DynamoDB", Database),
    service!("elasticache", "ElastiCache", Database),
    service!("redshift", "Redshift", Database),
    service!("documentdb", "DocumentDB", Database),
    service!("vpc", "Virtual Private Cloud", Networking),
    service!("nat-gateway", "NAT Gateway", Networking),
    service!("elb", "Elastic Load Balancing", Networking),
    service!("cloudfront", "CloudFront", Networking),
    service!("route53", "Route 53", Networking),
    service!("api-gateway", "API Gateway", Networking),
    service!("athena", "Athena", Analytics),
    service!("glue", "Glue", Analytics),
    service!("kinesis", "Kinesis", Analytics),
    service!("opensearch", "OpenSearch Service", Analytics),
    service!("sqs", "Simple Queue Service", Integration),
    service!("sns", "Simple Notification Service", Integration),
    service!("step-functions", "Step Functions", Integration),
    service!("cloudwatch", "CloudWatch", Management),
    service!("cloudtrail", "CloudTrail", Management),
    service!("kms", "Key Management Service", Security),
    service!("secrets-manager", "Secrets Manager", Security),
    service!("waf", "Web Application Firewall", Security),
    service!("sagemaker", "SageMaker", MachineLearning),
    service!("bedrock", "Bedrock", MachineLearning),
]);

pub fn service_definition(id: &str) -> Option<&'static ServiceDefinition> {
    SERVICE_CATALOG.iter().find(|d| d.id == id)
}

/// The set of service ids known to a deployment, in expansion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceCatalog {
    ids: Vec<String>,
}

impl ServiceCatalog {
    /// Build a catalog from configured ids. Duplicates keep their first position.
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let ids = ids
            .into_iter()
            .map(Into::into)
            .filter(|id: &String| seen.insert(id.clone()))
            .collect();
        Self { ids }
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|s| s == id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl Default for ServiceCatalog {
    fn default() -> Self {
        Self::from_ids(SERVICE_CATALOG.iter().map(|d| d.id))
    }
}

/// Maps service ids to the collector that knows how to query them.
///
/// New services are supported by registering another `Collector`; a default
/// collector, when set, serves every service without a dedicated one.
#[derive(Clone, Default)]
pub struct CollectorRegistry {
    collectors: HashMap<String, Arc<dyn Collector>>,
    fallback: Option<Arc<dyn Collector>>,
}

impl CollectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, service_id: impl Into<String>, collector: Arc<dyn Collector>) -> Self {
        self.collectors.insert(service_id.into(), collector);
        self
    }

    pub fn with_default(mut self, collector: Arc<dyn Collector>) -> Self {
        self.fallback = Some(collector);
        self
    }

    pub fn get(&self, service_id: &str) -> Option<Arc<dyn Collector>> {
        self.collectors
            .get(service_id)
            .cloned()
            .or_else(|| self.fallback.clone())
    }

    /// The registry a configured process runs with: the fixture collector
    /// serving every service, or an empty fixture when none is configured.
    pub fn from_config(config: &CostscopeConfig) -> Result<Self, CostscopeError> {
        let fixture = match config.fixture_path() {
            Some(path) => FixtureCollector::load(&path)?,
            None => {
                warn!("No collector fixture configured; every partition will report no data");
                FixtureCollector::empty()
            }
        };
        Ok(Self::new().with_default(Arc::new(fixture)))
    }

    pub fn registered_services(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.collectors.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}
