use std::path::Path;
use std::sync::LazyLock;
use regex::Regex;
use crate::errors::CostscopeError;
use super::types::CostscopeConfig;
use super::schema::CONFIG_SCHEMA;
use tracing::warn;

const MAX_CONFIG_BYTES: u64 = 1_048_576;

static CURRENCY_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{3}$").expect("currency regex"));

pub async fn parse_config(path: &Path) -> Result<CostscopeConfig, CostscopeError> {
    if !path.exists() {
        return Err(CostscopeError::Config(format!("Config file not found: {}", path.display())));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > MAX_CONFIG_BYTES {
        return Err(CostscopeError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    parse_config_str(&content)
}

pub fn parse_config_str(content: &str) -> Result<CostscopeConfig, CostscopeError> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(content)?;
    if yaml.is_null() {
        return Ok(CostscopeConfig::default());
    }

    // JSON Schema validation
    validate_schema(&yaml)?;

    // Parse into typed config
    let config: CostscopeConfig = serde_yaml::from_value(yaml)?;

    validate_semantics(&config)?;

    Ok(config)
}

/// Validate config against the JSON schema for structural correctness.
fn validate_schema(yaml: &serde_yaml::Value) -> Result<(), CostscopeError> {
    let json_value = serde_json::to_value(yaml)
        .map_err(|e| CostscopeError::Config(format!("Config conversion error: {}", e)))?;

    let compiled = jsonschema::JSONSchema::compile(&CONFIG_SCHEMA)
        .map_err(|e| CostscopeError::Config(format!("Schema compilation error: {}", e)))?;

    if let Err(errors) = compiled.validate(&json_value) {
        // Advisory only: the typed parse and semantic checks below are authoritative
        for e in errors {
            warn!(validation_error = %format!("{} at {}", e, e.instance_path), "Config schema warning");
        }
    }

    Ok(())
}

/// Reject values that parse but cannot drive an analysis.
fn validate_semantics(config: &CostscopeConfig) -> Result<(), CostscopeError> {
    if let Some(analysis) = &config.analysis {
        if analysis.concurrency == Some(0) {
            return Err(CostscopeError::Config("analysis.concurrency must be at least 1".into()));
        }
        if analysis.default_window_days == Some(0) {
            return Err(CostscopeError::Config("analysis.default_window_days must be at least 1".into()));
        }
        if let Some(currency) = &analysis.currency {
            if !CURRENCY_CODE.is_match(currency) {
                return Err(CostscopeError::Config(format!(
                    "analysis.currency '{}' is not a three-letter ISO 4217 code",
                    currency
                )));
            }
        }
        if analysis.default_regions.as_ref().is_some_and(|r| r.is_empty()) {
            warn!("analysis.default_regions is empty; every request must name its regions");
        }
    }

    if let Some(retry) = &config.retry {
        if retry.max_attempts == Some(0) {
            return Err(CostscopeError::Config("retry.max_attempts must be at least 1".into()));
        }
        if retry.attempt_timeout_ms == Some(0) {
            return Err(CostscopeError::Config("retry.attempt_timeout_ms must be positive".into()));
        }
        if let (Some(base), Some(max)) = (retry.base_delay_ms, retry.max_delay_ms) {
            if base > max {
                return Err(CostscopeError::Config(format!(
                    "retry.base_delay_ms ({}) exceeds retry.max_delay_ms ({})",
                    base, max
                )));
            }
        }
    }

    if config.report.as_ref().and_then(|r| r.top_n) == Some(0) {
        return Err(CostscopeError::Config("report.top_n must be at least 1".into()));
    }

    if config.server.as_ref().and_then(|s| s.max_concurrent_runs) == Some(0) {
        return Err(CostscopeError::Config("server.max_concurrent_runs must be at least 1".into()));
    }

    if let Some(catalog) = config.services.as_ref().and_then(|s| s.catalog.as_ref()) {
        if catalog.is_empty() {
            return Err(CostscopeError::Config("services.catalog must not be empty".into()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnalysisConfig, RetrySettings};

    const FULL: &str = r#"
analysis:
  concurrency: 8
  currency: EUR
  default_regions: [eu-west-1, eu-central-1]
  default_window_days: 14
retry:
  max_attempts: 3
  base_delay_ms: 250
  max_delay_ms: 5000
  attempt_timeout_ms: 30000
report:
  top_n: 5
storage:
  database: ./data/test.db
services:
  catalog: [ec2, s3]
collector:
  fixture: ./fixtures/demo.json
server:
  max_concurrent_runs: 3
"#;

    #[test]
    fn test_parse_full_config() {
        let config = parse_config_str(FULL).unwrap();
        let analysis = config.analysis.unwrap();
        assert_eq!(analysis.concurrency, Some(8));
        assert_eq!(analysis.currency.as_deref(), Some("EUR"));
        assert_eq!(analysis.default_regions.unwrap().len(), 2);
        assert_eq!(config.retry.unwrap().max_attempts, Some(3));
        assert_eq!(config.report.unwrap().top_n, Some(5));
        assert_eq!(config.services.unwrap().catalog.unwrap(), vec!["ec2", "s3"]);
        assert_eq!(config.server.unwrap().max_concurrent_runs, Some(3));
    }

    #[test]
    fn test_empty_document_is_default() {
        let config = parse_config_str("").unwrap();
        assert!(config.analysis.is_none());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = CostscopeConfig {
            analysis: Some(AnalysisConfig { concurrency: Some(0), ..Default::default() }),
            ..Default::default()
        };
        assert!(matches!(validate_semantics(&config), Err(CostscopeError::Config(_))));
    }

    #[test]
    fn test_inverted_delays_rejected() {
        let config = CostscopeConfig {
            retry: Some(RetrySettings {
                base_delay_ms: Some(10_000),
                max_delay_ms: Some(100),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(validate_semantics(&config).is_err());
    }

    #[test]
    fn test_bad_currency_rejected() {
        let err = parse_config_str("analysis:\n  currency: dollars\n").unwrap_err();
        assert!(matches!(err, CostscopeError::Config(_)));
    }

    #[test]
    fn test_wrong_type_fails_typed_parse() {
        assert!(parse_config_str("analysis:\n  concurrency: many\n").is_err());
    }

    #[tokio::test]
    async fn test_parse_config_missing_file() {
        let err = parse_config(Path::new("/nonexistent/costscope.yaml")).await.unwrap_err();
        assert!(matches!(err, CostscopeError::Config(_)));
    }

    #[tokio::test]
    async fn test_parse_config_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("costscope.yaml");
        std::fs::write(&path, FULL).unwrap();
        let config = parse_config(&path).await.unwrap();
        assert_eq!(config.fixture_path().unwrap(), Path::new("./fixtures/demo.json"));
    }
}
