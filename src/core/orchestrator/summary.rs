//! Run summary and report

use crate::domain::{ErrorStage, ProcessedItem};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Counters for one orchestration run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// When the run started
    pub started_at: DateTime<Utc>,

    /// Operations submitted
    pub total_operations: usize,

    /// Operations that finished without a processing error
    pub succeeded: usize,

    /// Operations that finished with a processing error
    pub failed: usize,

    /// Failed operations grouped by the stage of their final error
    pub failures_by_stage: BTreeMap<ErrorStage, usize>,

    /// Batches dispatched
    pub batches_dispatched: usize,

    /// HTTP calls made, including transport retries
    pub transport_attempts: u64,

    /// Item-level retries scheduled
    pub retries_scheduled: usize,

    /// The run stopped on a cancellation signal
    pub cancelled: bool,

    /// The run stopped at its deadline
    pub deadline_exceeded: bool,

    /// The iteration ceiling was hit
    pub iteration_ceiling_hit: bool,

    /// Wall-clock duration
    #[serde(with = "duration_ms")]
    pub duration: Duration,
}

impl RunSummary {
    pub fn new(total_operations: usize) -> Self {
        Self {
            started_at: Utc::now(),
            total_operations,
            succeeded: 0,
            failed: 0,
            failures_by_stage: BTreeMap::new(),
            batches_dispatched: 0,
            transport_attempts: 0,
            retries_scheduled: 0,
            cancelled: false,
            deadline_exceeded: false,
            iteration_ceiling_hit: false,
            duration: Duration::ZERO,
        }
    }

    /// Recount outcomes from the final items
    pub fn tally<I: ProcessedItem>(&mut self, items: &[I]) {
        self.succeeded = 0;
        self.failed = 0;
        self.failures_by_stage.clear();
        for item in items {
            match item.processing_error() {
                Some(error) => {
                    self.failed += 1;
                    *self.failures_by_stage.entry(error.stage).or_insert(0) += 1;
                }
                None => self.succeeded += 1,
            }
        }
    }

    /// Whether every operation succeeded
    pub fn is_successful(&self) -> bool {
        self.failed == 0
    }

    /// Success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.total_operations == 0 {
            return 100.0;
        }
        (self.succeeded as f64 / self.total_operations as f64) * 100.0
    }

    pub fn log_summary(&self) {
        crate::log_run_complete!(
            self.total_operations,
            self.succeeded,
            self.failed,
            self.duration
        );
        tracing::info!(
            batches = self.batches_dispatched,
            transport_attempts = self.transport_attempts,
            retries_scheduled = self.retries_scheduled,
            success_rate = format!("{:.2}%", self.success_rate()),
            "Batch run statistics"
        );

        if self.cancelled {
            tracing::warn!("Run was cancelled before all operations settled");
        }
        if self.deadline_exceeded {
            tracing::warn!("Run deadline elapsed before all operations settled");
        }
        if self.iteration_ceiling_hit {
            tracing::error!("Run hit the iteration ceiling");
        }
        for (stage, count) in &self.failures_by_stage {
            tracing::warn!(stage = %stage, count = count, "Operations failed");
        }
    }
}

/// Final items plus the summary of the run that produced them
#[derive(Debug)]
pub struct RunReport<I> {
    /// One item per submitted operation, each in a terminal state
    pub items: Vec<I>,
    pub summary: RunSummary,
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }
}
