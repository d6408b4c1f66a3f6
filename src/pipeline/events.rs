use rust_decimal::Decimal;
use crate::errors::FailureKind;
use crate::models::RunStatus;
use super::phase::RunPhase;

/// Messages sent from a running analysis to progress displays and loggers.
#[derive(Debug, Clone)]
pub enum RunEvent {
    /// Run accepted and partitioned
    RunStarted {
        run_id: String,
        partitions: usize,
    },
    PhaseStarted {
        phase: RunPhase,
        display_name: String,
    },
    PhaseCompleted {
        phase: RunPhase,
        display_name: String,
    },
    /// A partition produced its outcome
    PartitionCompleted {
        partition: String,
        success: bool,
        failure: Option<FailureKind>,
    },
    /// Run reached a publishable state
    RunCompleted {
        status: RunStatus,
        total_cost: Decimal,
        total_potential_savings: Decimal,
        partitions_failed: usize,
        duration_ms: u64,
    },
    RunFailed {
        status: RunStatus,
        error: String,
    },
}
