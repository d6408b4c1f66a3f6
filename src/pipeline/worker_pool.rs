use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use futures::FutureExt;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use crate::collectors::CollectorRegistry;
use crate::errors::{with_retry, CostscopeError, FailureKind, RetryConfig, RetryError};
use crate::models::{AnalysisMode, Partition, PartitionOutcome};
use super::results::CompletedPartition;

/// Executes partitions against their collectors under a fixed concurrency ceiling.
///
/// One pool is shared by every run of an engine, so the ceiling bounds the
/// number of collector calls in flight across the whole process.
pub struct WorkerPool {
    collectors: CollectorRegistry,
    permits: Arc<Semaphore>,
    concurrency: usize,
    retry: RetryConfig,
    currency: String,
}

impl WorkerPool {
    pub fn new(
        collectors: CollectorRegistry,
        concurrency: usize,
        retry: RetryConfig,
        currency: impl Into<String>,
    ) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            collectors,
            permits: Arc::new(Semaphore::new(concurrency)),
            concurrency,
            retry,
            currency: currency.into(),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Collector calls currently holding a permit.
    pub fn in_flight(&self) -> usize {
        self.concurrency - self.permits.available_permits()
    }

    /// Spawn the partition and deliver its single outcome on `tx`.
    pub fn submit(
        self: &Arc<Self>,
        partition: Partition,
        mode: AnalysisMode,
        tx: mpsc::Sender<CompletedPartition>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let pool = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = pool.execute(&partition, mode, &cancel).await;
            if tx.send(CompletedPartition::new(partition, outcome)).await.is_err() {
                debug!("Outcome receiver closed before delivery");
            }
        })
    }

    /// Run one partition to its outcome. Never returns an error: every failure
    /// mode is folded into a `PartitionOutcome::Failure`.
    pub async fn execute(&self, partition: &Partition, mode: AnalysisMode, cancel: &CancellationToken) -> PartitionOutcome {
        let Some(collector) = self.collectors.get(&partition.service_id) else {
            warn!(partition = %partition, "No collector registered for service");
            return PartitionOutcome::failure(
                FailureKind::UnknownService,
                format!("no collector registered for service '{}'", partition.service_id),
                false,
                0,
            );
        };

        let _permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return PartitionOutcome::failure(FailureKind::Cancelled, "run cancelled before start", false, 0);
            }
            permit = Arc::clone(&self.permits).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => {
                    return PartitionOutcome::failure(FailureKind::Internal, "worker pool is closed", false, 0);
                }
            },
        };

        let operation = partition.to_string();
        let currency = self.currency.as_str();
        let result = with_retry(&operation, &self.retry, cancel, || {
            let call = collector.collect(&partition.service_id, &partition.region_id, &partition.window);
            async move {
                let data = AssertUnwindSafe(call)
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| Err(CostscopeError::Internal(panic_message(panic))))?;
                data.validate(currency)?;
                Ok::<_, CostscopeError>(data)
            }
        })
        .await;

        match result {
            Ok(data) => {
                debug!(partition = %partition, collector = collector.name(), "Partition collected");
                PartitionOutcome::Success(data.restrict(mode))
            }
            Err(RetryError::Permanent { error, attempts }) => {
                let kind = error.classify().kind;
                warn!(partition = %partition, kind = %kind, error = %error, "Partition failed");
                PartitionOutcome::failure(kind, error.to_string(), false, attempts)
            }
            Err(RetryError::Exhausted { error, attempts }) => {
                warn!(partition = %partition, attempts, error = %error, "Partition exhausted its retries");
                PartitionOutcome::failure(FailureKind::Exhausted, error.to_string(), true, attempts)
            }
            Err(RetryError::Cancelled { attempts }) => {
                PartitionOutcome::failure(FailureKind::Cancelled, "run cancelled while retrying", false, attempts)
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("collector panicked: {}", detail)
}
