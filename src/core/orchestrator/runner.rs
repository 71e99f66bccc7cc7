//! Orchestration loop
//!
//! Drives every submitted operation to a terminal state. One coordinating
//! loop owns the FIFO work queue and the retry schedule; it dispatches
//! batches, schedules per-item retries with backoff, and waits on the next
//! retry timer when the queue is empty. There is no shared mutable state
//! across tasks.

use super::schedule::RetrySchedule;
use super::summary::{RunReport, RunSummary};
use crate::adapters::http::BatchTransport;
use crate::config::{ClassroomBatchConfig, RetryConfig, SecretString};
use crate::core::batch::{BatchDispatcher, ResponseParser};
use crate::core::limits::{Interruption, RunLimits};
use crate::core::retry::RetryPolicy;
use crate::domain::operation::validate_path;
use crate::domain::{
    BatchError, ErrorStage, Operation, ProcessedItem, ProcessingError, Result,
};
use secrecy::ExposeSecret;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Settings for one orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Batch endpoint URL
    pub batch_url: String,

    /// Operations per batch
    pub max_operations_per_batch: usize,

    /// Retry policy configuration, shared by both retry layers
    pub retry: RetryConfig,

    /// Optional wall-clock limit for a run
    pub deadline: Option<Duration>,

    /// Overrides the dispatch ceiling of `operations × (max_retries + 1)`
    pub max_dispatches: Option<usize>,
}

impl OrchestratorSettings {
    /// Build settings from a validated configuration
    pub fn from_config(config: &ClassroomBatchConfig) -> Result<Self> {
        let batch_url = config.endpoint.resolved_batch_url().ok_or_else(|| {
            BatchError::Configuration(
                "endpoint.batch_url is required when endpoint.api = 'custom'".to_string(),
            )
        })?;

        Ok(Self {
            batch_url,
            max_operations_per_batch: config.endpoint.resolved_batch_size(),
            retry: config.retry.clone(),
            deadline: config.run.deadline_seconds.map(Duration::from_secs),
            max_dispatches: None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    Cancelled,
    DeadlineExceeded,
    IterationCeiling,
}

impl StopReason {
    fn to_error(self) -> ProcessingError {
        match self {
            StopReason::Cancelled => ProcessingError::new(
                ErrorStage::Cancelled,
                "Run cancelled before the operation completed",
            ),
            StopReason::DeadlineExceeded => ProcessingError::new(
                ErrorStage::Deadline,
                "Run deadline exceeded before the operation completed",
            ),
            StopReason::IterationCeiling => {
                ProcessingError::new(ErrorStage::Orchestration, "Max iterations reached")
            }
        }
    }
}

impl From<Interruption> for StopReason {
    fn from(interruption: Interruption) -> Self {
        match interruption {
            Interruption::Cancelled => StopReason::Cancelled,
            Interruption::DeadlineExceeded => StopReason::DeadlineExceeded,
        }
    }
}

/// Runs operations through batched dispatch until all are settled
pub struct Orchestrator {
    dispatcher: BatchDispatcher,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    /// Create an orchestrator sending through `transport`
    pub fn new(transport: Arc<dyn BatchTransport>, settings: OrchestratorSettings) -> Self {
        let dispatcher = BatchDispatcher::new(
            transport,
            RetryPolicy::new(settings.retry.clone()),
            settings.batch_url.clone(),
            settings.max_operations_per_batch,
        );
        Self {
            dispatcher,
            settings,
        }
    }

    /// Settings this orchestrator was built with
    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Run every operation to a terminal state
    ///
    /// Returns one item per submitted operation, in submission order. Once
    /// dispatching has begun, failures are recorded on items and never
    /// returned as `Err`.
    ///
    /// # Errors
    ///
    /// Fails before any dispatch when the credential is missing or blank,
    /// when two operations share a correlation token, when a path cannot be
    /// placed on a request line, or when the batch size is zero.
    pub async fn run<I, P>(
        &self,
        operations: Vec<Operation<I>>,
        parser: &P,
        credential: Option<&SecretString>,
        shutdown: Option<watch::Receiver<bool>>,
    ) -> Result<RunReport<I>>
    where
        I: ProcessedItem,
        P: ResponseParser<I> + ?Sized,
    {
        let credential = credential
            .filter(|c| !c.expose_secret().is_blank())
            .ok_or_else(|| {
                BatchError::MissingCredential(
                    "A bearer access token is required before any batch is sent".to_string(),
                )
            })?;

        let batch_size = self.settings.max_operations_per_batch;
        if batch_size == 0 {
            return Err(BatchError::Configuration(
                "max_operations_per_batch must be at least 1".to_string(),
            ));
        }

        let positions = index_operations(&operations)?;
        let total = operations.len();
        let policy = self.dispatcher.policy().clone();
        let ceiling = self.settings.max_dispatches.unwrap_or_else(|| {
            total
                .saturating_mul(policy.max_retries() as usize + 1)
                .max(1)
        });

        let started = Instant::now();
        let mut limits = RunLimits::new(shutdown, self.settings.deadline.map(|d| started + d));
        let mut summary = RunSummary::new(total);

        tracing::info!(
            operations = total,
            batch_size = batch_size,
            max_retries = policy.max_retries(),
            url = %self.settings.batch_url,
            "Starting batch run"
        );

        let mut queue: VecDeque<Operation<I>> = operations.into();
        let mut schedule: RetrySchedule<I> = RetrySchedule::new();
        let mut finished: Vec<Operation<I>> = Vec::with_capacity(total);
        let mut stop: Option<StopReason> = None;

        loop {
            if let Some(interruption) = limits.check() {
                stop = Some(interruption.into());
                break;
            }

            for mut op in schedule.pop_due(Instant::now()) {
                op.item.clear_error();
                queue.push_back(op);
            }

            if !queue.is_empty() {
                if summary.batches_dispatched >= ceiling {
                    stop = Some(StopReason::IterationCeiling);
                    break;
                }

                let take = batch_size.min(queue.len());
                let batch: Vec<Operation<I>> = queue.drain(..take).collect();
                let result = self
                    .dispatcher
                    .dispatch_within(batch, credential, parser, &mut limits)
                    .await;

                summary.batches_dispatched += 1;
                summary.transport_attempts += u64::from(result.transport_attempts);
                finished.extend(result.attempted);
                if let Some(interruption) = result.interrupted {
                    queue.extend(result.unsent);
                    stop = Some(interruption.into());
                    break;
                }

                for op in result.to_retry {
                    let delay = policy.delay_for(op.retries_attempted);
                    crate::log_retry_scheduled!(
                        op.id,
                        op.retries_attempted,
                        delay,
                        op.item.processing_error().and_then(|e| e.status_code())
                    );
                    summary.retries_scheduled += 1;
                    schedule.schedule(op, Instant::now() + delay);
                }
                continue;
            }

            let Some(fire_at) = schedule.next_fire_at() else {
                break;
            };
            let wake_at = limits.deadline().map_or(fire_at, |d| d.min(fire_at));

            tracing::debug!(
                pending_retries = schedule.len(),
                wait_ms = wake_at.saturating_duration_since(Instant::now()).as_millis() as u64,
                "Waiting for next scheduled retry"
            );

            if let Some(interruption) = limits.sleep_until(fire_at).await {
                stop = Some(interruption.into());
                break;
            }
        }

        if let Some(reason) = stop {
            let pending: Vec<Operation<I>> =
                queue.drain(..).chain(schedule.drain()).collect();
            tracing::warn!(
                reason = ?reason,
                pending = pending.len(),
                "Force-finalizing pending operations"
            );
            for mut op in pending {
                finalize(&mut op, reason);
                finished.push(op);
            }
            match reason {
                StopReason::Cancelled => summary.cancelled = true,
                StopReason::DeadlineExceeded => summary.deadline_exceeded = true,
                StopReason::IterationCeiling => summary.iteration_ceiling_hit = true,
            }
        }

        debug_assert_eq!(finished.len(), total);
        finished.sort_by_key(|op| positions.get(op.id.as_str()).copied().unwrap_or(usize::MAX));

        let items: Vec<I> = finished.into_iter().map(|op| op.item).collect();
        summary.tally(&items);
        summary.duration = started.elapsed();
        summary.log_summary();

        Ok(RunReport { items, summary })
    }
}

fn index_operations<I>(operations: &[Operation<I>]) -> Result<HashMap<String, usize>> {
    let mut seen = HashSet::with_capacity(operations.len());
    let mut positions = HashMap::with_capacity(operations.len());
    for (idx, op) in operations.iter().enumerate() {
        if !seen.insert(op.id.as_str()) {
            return Err(BatchError::Validation(format!(
                "Duplicate correlation token '{}' in run",
                op.id
            )));
        }
        validate_path(&op.path)
            .map_err(|e| BatchError::Validation(format!("Operation {}: {e}", op.id)))?;
        positions.insert(op.id.as_str().to_string(), idx);
    }
    Ok(positions)
}

fn finalize<I: ProcessedItem>(op: &mut Operation<I>, reason: StopReason) {
    let mut error = reason.to_error().with_correlation_id(op.id.clone());
    if let Some(last) = op.item.processing_error() {
        error.message = format!("{}; last error: {last}", error.message);
        if let Some(code) = last.status_code() {
            error = error.with_status(code);
        }
    }
    op.item.record_error(error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CorrelationToken, HttpMethod, MigrationItem};

    fn op(id: &str) -> Operation<MigrationItem> {
        Operation::new(
            CorrelationToken::new(id).unwrap(),
            HttpMethod::Post,
            "/p",
            serde_json::json!({}),
            MigrationItem::new(id),
        )
    }

    #[test]
    fn test_duplicate_tokens_rejected() {
        let ops = vec![op("a"), op("b"), op("a")];
        assert!(matches!(
            index_operations(&ops),
            Err(BatchError::Validation(_))
        ));
    }

    #[test]
    fn test_finalize_keeps_last_error() {
        let mut operation = op("a");
        operation
            .item
            .record_error(ProcessingError::new(ErrorStage::Item, "Batch item failed").with_status(503));

        finalize(&mut operation, StopReason::Cancelled);

        let err = operation.item.processing_error.unwrap();
        assert_eq!(err.stage, ErrorStage::Cancelled);
        assert!(err.message.contains("last error: [item] Batch item failed (status 503)"));
        assert_eq!(err.status_code(), Some(503));
    }

    #[test]
    fn test_finalize_iteration_ceiling() {
        let mut operation = op("a");
        finalize(&mut operation, StopReason::IterationCeiling);
        let err = operation.item.processing_error.unwrap();
        assert_eq!(err.stage, ErrorStage::Orchestration);
        assert_eq!(err.message, "Max iterations reached");
    }

    #[test]
    fn test_path_with_line_break_rejected() {
        let mut bad = op("b");
        bad.path = "/v1/x\r\nContent-ID: <c>".to_string();
        let ops = vec![op("a"), bad];
        let err = index_operations(&ops).unwrap_err();
        assert!(matches!(err, BatchError::Validation(_)));
        assert!(err.to_string().contains("Operation b"));
    }
}
