use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum RunPhase {
    Partitioning,
    Collecting,
    Aggregating,
    Persisting,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Partitioning => "partitioning",
            Self::Collecting => "collecting",
            Self::Aggregating => "aggregating",
            Self::Persisting => "persisting",
        }
    }

    pub fn display_name(&self) -> &'static str {
        PHASES
            .iter()
            .find(|p| p.name == *self)
            .map(|p| p.display_name)
            .unwrap_or("Unknown")
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct PhaseDefinition {
    pub name: RunPhase,
    pub display_name: &'static str,
    pub description: &'static str,
}

pub static PHASES: &[PhaseDefinition] = &[
    PhaseDefinition {
        name: RunPhase::Partitioning,
        display_name: "Partitioning",
        description: "Expand the request into service/region work units",
    },
    PhaseDefinition {
        name: RunPhase::Collecting,
        display_name: "Collecting",
        description: "Query every partition's collector with bounded concurrency",
    },
    PhaseDefinition {
        name: RunPhase::Aggregating,
        display_name: "Aggregating",
        description: "Merge partition outcomes into a consolidated report",
    },
    PhaseDefinition {
        name: RunPhase::Persisting,
        display_name: "Persisting",
        description: "Publish the report and move the latest pointer",
    },
];
