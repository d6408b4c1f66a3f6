pub mod collector;
pub mod fixture;
pub mod registry;

pub use collector::Collector;
pub use fixture::FixtureCollector;
pub use registry::{CollectorRegistry, ServiceCatalog, ServiceCategory, ServiceDefinition, SERVICE_CATALOG, service_definition};
