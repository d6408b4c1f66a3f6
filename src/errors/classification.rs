use serde::{Deserialize, Serialize};
use super::types::CostscopeError;

/// Why a partition failed. Recorded on every `PartitionFailure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    Throttled,
    Timeout,
    Network,
    ServiceUnavailable,
    PermissionDenied,
    UnsupportedRegion,
    UnknownService,
    InvalidPayload,
    CurrencyMismatch,
    /// Transient failures kept recurring until the attempt budget ran out.
    Exhausted,
    Cancelled,
    Internal,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Throttled => "throttled",
            Self::Timeout => "timeout",
            Self::Network => "network",
            Self::ServiceUnavailable => "service_unavailable",
            Self::PermissionDenied => "permission_denied",
            Self::UnsupportedRegion => "unsupported_region",
            Self::UnknownService => "unknown_service",
            Self::InvalidPayload => "invalid_payload",
            Self::CurrencyMismatch => "currency_mismatch",
            Self::Exhausted => "exhausted",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ErrorClassification {
    pub kind: FailureKind,
    pub retryable: bool,
}

impl CostscopeError {
    /// Classify this error to determine its failure kind and whether it can be retried.
    pub fn classify(&self) -> ErrorClassification {
        match self {
            // Transient collector errors
            CostscopeError::Throttled(_) => ErrorClassification {
                kind: FailureKind::Throttled,
                retryable: true,
            },
            CostscopeError::Timeout(_) => ErrorClassification {
                kind: FailureKind::Timeout,
                retryable: true,
            },
            CostscopeError::Network(_) | CostscopeError::Io(_) => ErrorClassification {
                kind: FailureKind::Network,
                retryable: true,
            },
            CostscopeError::ServiceUnavailable(_) => ErrorClassification {
                kind: FailureKind::ServiceUnavailable,
                retryable: true,
            },

            // Permanent collector errors
            CostscopeError::PermissionDenied(_) => ErrorClassification {
                kind: FailureKind::PermissionDenied,
                retryable: false,
            },
            CostscopeError::UnsupportedRegion(_) => ErrorClassification {
                kind: FailureKind::UnsupportedRegion,
                retryable: false,
            },
            CostscopeError::UnknownService(_) => ErrorClassification {
                kind: FailureKind::UnknownService,
                retryable: false,
            },
            CostscopeError::InvalidPayload(_) | CostscopeError::Json(_) | CostscopeError::Yaml(_) => {
                ErrorClassification {
                    kind: FailureKind::InvalidPayload,
                    retryable: false,
                }
            }
            CostscopeError::CurrencyMismatch(_) => ErrorClassification {
                kind: FailureKind::CurrencyMismatch,
                retryable: false,
            },
            CostscopeError::Cancelled(_) => ErrorClassification {
                kind: FailureKind::Cancelled,
                retryable: false,
            },

            // Engine-level errors never reach the retry loop in practice
            CostscopeError::InvalidRequest(_)
            | CostscopeError::Config(_)
            | CostscopeError::NoDataAvailable(_)
            | CostscopeError::AmountOverflow(_)
            | CostscopeError::DuplicateOutcome(_)
            | CostscopeError::RunNotFound(_)
            | CostscopeError::Internal(_) => ErrorClassification {
                kind: FailureKind::Internal,
                retryable: false,
            },
            CostscopeError::StoreUnavailable(_) | CostscopeError::Database(_) => ErrorClassification {
                kind: FailureKind::ServiceUnavailable,
                retryable: true,
            },
        }
    }
}
