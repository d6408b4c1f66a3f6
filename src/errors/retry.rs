use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::classification::{ErrorClassification, FailureKind};
use super::types::CostscopeError;
use tracing::{debug, warn};

/// Retry configuration for collector invocations.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Absolute wall-clock limit for a single attempt.
    pub attempt_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(20),
            attempt_timeout: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    /// Calculate the delay before the next attempt (`attempt` is 0-indexed).
    ///
    /// - Throttled: base doubled, since the downstream API asked us to slow down
    /// - Default: base * 2^attempt
    ///
    /// Both get up to 50% random jitter and are capped at `max_delay`.
    pub fn backoff(&self, classification: &ErrorClassification, attempt: u32) -> Duration {
        let base = match classification.kind {
            FailureKind::Throttled => self.base_delay.saturating_mul(2),
            _ => self.base_delay,
        };
        let exp = base.saturating_mul(2u32.saturating_pow(attempt)).min(self.max_delay);
        let jitter = exp.mul_f64(rand::random::<f64>() * 0.5);
        (exp + jitter).min(self.max_delay)
    }
}

/// Terminal result of a retry loop that did not produce a value.
#[derive(Debug)]
pub enum RetryError {
    /// The error was classified as non-retryable.
    Permanent { error: CostscopeError, attempts: u32 },
    /// Every attempt failed with a retryable error.
    Exhausted { error: CostscopeError, attempts: u32 },
    /// The cancel token fired while waiting to retry.
    Cancelled { attempts: u32 },
}

impl RetryError {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Permanent { attempts, .. }
            | Self::Exhausted { attempts, .. }
            | Self::Cancelled { attempts } => *attempts,
        }
    }
}

/// Execute an async operation with retry logic.
///
/// Every attempt is bounded by `attempt_timeout`; running over it counts as a
/// retryable `Timeout`. Retries only happen for retryable errors and stop once
/// `max_attempts` is reached or `cancel` fires during a backoff sleep.
pub async fn with_retry<F, Fut, T>(
    operation_name: &str,
    config: &RetryConfig,
    cancel: &CancellationToken,
    mut factory: F,
) -> Result<T, RetryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CostscopeError>>,
{
    let max_attempts = config.max_attempts.max(1);

    for attempt in 0..max_attempts {
        let result = match tokio::time::timeout(config.attempt_timeout, factory()).await {
            Ok(result) => result,
            Err(_) => Err(CostscopeError::Timeout(format!(
                "{} did not respond within {}ms",
                operation_name,
                config.attempt_timeout.as_millis()
            ))),
        };

        let error = match result {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        let classification = error.classify();
        if !classification.retryable {
            warn!(
                operation = operation_name,
                error_type = %classification.kind,
                error = %error,
                "Non-retryable error, failing immediately"
            );
            return Err(RetryError::Permanent { error, attempts: attempt + 1 });
        }

        if attempt + 1 >= max_attempts {
            warn!(
                operation = operation_name,
                attempt = attempt + 1,
                max = max_attempts,
                error = %error,
                "Max retries exhausted"
            );
            return Err(RetryError::Exhausted { error, attempts: attempt + 1 });
        }

        let delay = config.backoff(&classification, attempt);
        debug!(
            operation = operation_name,
            attempt = attempt + 1,
            max = max_attempts,
            error_type = %classification.kind,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Retrying after error"
        );

        tokio::select! {
            _ = cancel.cancelled() => {
                return Err(RetryError::Cancelled { attempts: attempt + 1 });
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }

    // max_attempts >= 1, so the loop always returns
    Err(RetryError::Exhausted {
        error: CostscopeError::Internal("Retry loop exited unexpectedly".into()),
        attempts: max_attempts,
    })
}
