use std::collections::BTreeSet;
use std::sync::LazyLock;
use regex::Regex;
use crate::collectors::ServiceCatalog;
use crate::errors::CostscopeError;
use crate::models::{AnalysisRequest, Partition, ServiceScope};

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]*$").expect("identifier regex"));

/// Expand a request into its partitions: services in order, then regions in order.
///
/// `scope = all` resolves against `catalog`. Pure; the same request and catalog
/// always produce the same list.
pub fn partition(request: &AnalysisRequest, catalog: &ServiceCatalog) -> Result<Vec<Partition>, CostscopeError> {
    if !request.window.is_valid() {
        return Err(CostscopeError::InvalidRequest(format!(
            "window start {} must be before end {}",
            request.window.start, request.window.end
        )));
    }

    if request.regions.is_empty() {
        return Err(CostscopeError::InvalidRequest("no regions requested".into()));
    }
    if let Some(bad) = request.regions.iter().find(|r| !IDENTIFIER.is_match(r)) {
        return Err(CostscopeError::InvalidRequest(format!("invalid region id '{}'", bad)));
    }

    let services: Vec<&str> = match &request.scope {
        ServiceScope::All => catalog.ids().iter().map(String::as_str).collect(),
        ServiceScope::Services(ids) => resolve_explicit(ids, catalog)?,
    };
    if services.is_empty() {
        return Err(CostscopeError::InvalidRequest("no services to analyze".into()));
    }

    let partitions = services
        .iter()
        .flat_map(|service| {
            request
                .regions
                .iter()
                .map(move |region| Partition::new(*service, region.as_str(), request.window.clone()))
        })
        .collect();
    Ok(partitions)
}

fn resolve_explicit<'a>(ids: &'a BTreeSet<String>, catalog: &ServiceCatalog) -> Result<Vec<&'a str>, CostscopeError> {
    for id in ids {
        if !IDENTIFIER.is_match(id) {
            return Err(CostscopeError::InvalidRequest(format!("invalid service id '{}'", id)));
        }
        if !catalog.contains(id) {
            return Err(CostscopeError::InvalidRequest(format!("unknown service '{}'", id)));
        }
    }
    Ok(ids.iter().map(String::as_str).collect())
}
