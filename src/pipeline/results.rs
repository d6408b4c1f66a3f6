use std::collections::HashMap;
use tracing::error;
use crate::errors::CostscopeError;
use crate::models::{Partition, PartitionKey, PartitionOutcome};

/// One partition together with its single outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPartition {
    pub partition: Partition,
    pub outcome: PartitionOutcome,
}

impl CompletedPartition {
    pub fn new(partition: Partition, outcome: PartitionOutcome) -> Self {
        Self { partition, outcome }
    }
}

/// Fan-in point for a run. Owned by the orchestrator task alone.
///
/// Outcomes may arrive in any order. Each expected partition accepts exactly
/// one; a second is rejected and the first is kept.
pub struct ResultCollector {
    expected: Vec<Partition>,
    index: HashMap<PartitionKey, usize>,
    outcomes: Vec<Option<PartitionOutcome>>,
    completed: usize,
    failed: usize,
}

impl ResultCollector {
    pub fn new(expected: Vec<Partition>) -> Self {
        let index = expected
            .iter()
            .enumerate()
            .map(|(i, p)| (p.key(), i))
            .collect();
        let outcomes = vec![None; expected.len()];
        Self {
            expected,
            index,
            outcomes,
            completed: 0,
            failed: 0,
        }
    }

    pub fn record(&mut self, completed: CompletedPartition) -> Result<(), CostscopeError> {
        let key = completed.partition.key();
        let slot = *self.index.get(&key).ok_or_else(|| {
            CostscopeError::Internal(format!("outcome for partition {} that is not part of this run", key))
        })?;

        if self.outcomes[slot].is_some() {
            error!(partition = %key, "Second outcome received for partition; keeping the first");
            return Err(CostscopeError::DuplicateOutcome(key.to_string()));
        }

        if !completed.outcome.is_success() {
            self.failed += 1;
        }
        self.completed += 1;
        self.outcomes[slot] = Some(completed.outcome);
        Ok(())
    }

    pub fn total(&self) -> usize {
        self.expected.len()
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn is_complete(&self) -> bool {
        self.completed == self.expected.len()
    }

    /// Partitions still waiting for an outcome, in expansion order.
    pub fn pending(&self) -> Vec<&Partition> {
        self.expected
            .iter()
            .zip(&self.outcomes)
            .filter(|(_, o)| o.is_none())
            .map(|(p, _)| p)
            .collect()
    }

    /// The full outcome set in expansion order. Fails unless every partition reported.
    pub fn finish(self) -> Result<Vec<CompletedPartition>, CostscopeError> {
        if !self.is_complete() {
            return Err(CostscopeError::Internal(format!(
                "{} of {} partitions have no outcome",
                self.expected.len() - self.completed,
                self.expected.len()
            )));
        }
        Ok(self
            .expected
            .into_iter()
            .zip(self.outcomes)
            .filter_map(|(partition, outcome)| outcome.map(|o| CompletedPartition::new(partition, o)))
            .collect())
    }
}
