use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Half-open billing window `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TimeWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The `days` full days ending today (exclusive).
    pub fn last_days(days: i64) -> Self {
        let end = Utc::now().date_naive();
        Self { start: end - Duration::days(days.max(1)), end }
    }

    pub fn is_valid(&self) -> bool {
        self.start < self.end
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisMode {
    #[default]
    Full,
    CostsOnly,
    RecommendationsOnly,
}

impl AnalysisMode {
    pub fn includes_costs(&self) -> bool {
        !matches!(self, Self::RecommendationsOnly)
    }

    pub fn includes_recommendations(&self) -> bool {
        !matches!(self, Self::CostsOnly)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "FULL",
            Self::CostsOnly => "COSTS_ONLY",
            Self::RecommendationsOnly => "RECOMMENDATIONS_ONLY",
        }
    }
}

impl std::fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AnalysisMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "full" => Ok(Self::Full),
            "costs_only" | "costs" => Ok(Self::CostsOnly),
            "recommendations_only" | "recommendations" => Ok(Self::RecommendationsOnly),
            other => Err(format!("Invalid analysis mode: {}", other)),
        }
    }
}

/// Which services a request covers. Serialized as `"all"` or a list of ids.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "ScopeRepr", into = "ScopeRepr")]
pub enum ServiceScope {
    #[default]
    All,
    Services(BTreeSet<String>),
}

impl ServiceScope {
    pub fn services<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Services(ids.into_iter().map(Into::into).collect())
    }

    /// Parse the CLI form: `all` or a comma-separated list.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("all") {
            Self::All
        } else {
            Self::services(
                value.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string),
            )
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum ScopeRepr {
    Keyword(String),
    List(Vec<String>),
}

impl TryFrom<ScopeRepr> for ServiceScope {
    type Error = String;

    fn try_from(repr: ScopeRepr) -> Result<Self, Self::Error> {
        match repr {
            ScopeRepr::Keyword(k) if k.eq_ignore_ascii_case("all") => Ok(Self::All),
            ScopeRepr::Keyword(k) => Err(format!("Invalid scope '{}': expected \"all\" or a list of services", k)),
            ScopeRepr::List(ids) => Ok(Self::Services(ids.into_iter().collect())),
        }
    }
}

impl From<ServiceScope> for ScopeRepr {
    fn from(scope: ServiceScope) -> Self {
        match scope {
            ServiceScope::All => ScopeRepr::Keyword("all".to_string()),
            ServiceScope::Services(ids) => ScopeRepr::List(ids.into_iter().collect()),
        }
    }
}

/// A submitted analysis. Never mutated after submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub scope: ServiceScope,
    pub regions: BTreeSet<String>,
    pub window: TimeWindow,
    #[serde(default)]
    pub mode: AnalysisMode,
}

impl AnalysisRequest {
    pub fn new<I, S>(scope: ServiceScope, regions: I, window: TimeWindow, mode: AnalysisMode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            scope,
            regions: regions.into_iter().map(Into::into).collect(),
            window,
            mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_all_deserialize() {
        let scope: ServiceScope = serde_json::from_str("\"all\"").unwrap();
        assert_eq!(scope, ServiceScope::All);
        let scope: ServiceScope = serde_json::from_str("\"ALL\"").unwrap();
        assert_eq!(scope, ServiceScope::All);
    }

    #[test]
    fn test_scope_list_deserialize() {
        let scope: ServiceScope = serde_json::from_str(r#"["s3", "ec2", "s3"]"#).unwrap();
        assert_eq!(scope, ServiceScope::services(["ec2", "s3"]));
    }

    #[test]
    fn test_scope_rejects_unknown_keyword() {
        assert!(serde_json::from_str::<ServiceScope>("\"everything\"").is_err());
    }

    #[test]
    fn test_scope_parse_cli_form() {
        assert_eq!(ServiceScope::parse("all"), ServiceScope::All);
        assert_eq!(ServiceScope::parse("ec2, rds,,"), ServiceScope::services(["ec2", "rds"]));
    }

    #[test]
    fn test_mode_serialization() {
        assert_eq!(serde_json::to_string(&AnalysisMode::CostsOnly).unwrap(), "\"COSTS_ONLY\"");
        let parsed: AnalysisMode = serde_json::from_str("\"RECOMMENDATIONS_ONLY\"").unwrap();
        assert_eq!(parsed, AnalysisMode::RecommendationsOnly);
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("costs-only".parse::<AnalysisMode>().unwrap(), AnalysisMode::CostsOnly);
        assert_eq!("FULL".parse::<AnalysisMode>().unwrap(), AnalysisMode::Full);
        assert!("partial".parse::<AnalysisMode>().is_err());
    }

    #[test]
    fn test_window_validity() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert!(TimeWindow::new(start, end).is_valid());
        assert!(!TimeWindow::new(end, start).is_valid());
        assert!(!TimeWindow::new(start, start).is_valid());
        assert_eq!(TimeWindow::new(start, end).days(), 31);
    }

    #[test]
    fn test_last_days_window() {
        let window = TimeWindow::last_days(30);
        assert_eq!(window.days(), 30);
        assert!(window.is_valid());
    }
}
