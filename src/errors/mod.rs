pub mod types;
pub mod classification;
pub mod retry;

pub use types::CostscopeError;
pub use classification::{ErrorClassification, FailureKind};
pub use retry::{RetryConfig, RetryError, with_retry};
