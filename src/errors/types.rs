use thiserror::Error;

#[derive(Debug, Error)]
pub enum CostscopeError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Throttled: {0}")]
    Throttled(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Unsupported region: {0}")]
    UnsupportedRegion(String),

    #[error("Unknown service: {0}")]
    UnknownService(String),

    #[error("Invalid collector payload: {0}")]
    InvalidPayload(String),

    #[error("Currency mismatch: {0}")]
    CurrencyMismatch(String),

    #[error("Amount out of range: {0}")]
    AmountOverflow(String),

    #[error("No data available: {0}")]
    NoDataAvailable(String),

    #[error("Report store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Run cancelled: {0}")]
    Cancelled(String),

    #[error("Duplicate outcome for partition {0}")]
    DuplicateOutcome(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
