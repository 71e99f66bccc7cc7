//! Batch dispatcher
//!
//! Sends one batch: encode, POST with transport-level retries, decode, apply
//! the response parser, then partition the operations into settled ones and
//! ones eligible for an item-level retry.

use super::decoder::{apply_parts, decode_batch_response};
use super::encoder::BatchEncoder;
use super::parser::ResponseParser;
use crate::adapters::http::{BatchRequest, BatchResponse, BatchTransport};
use crate::config::SecretString;
use crate::core::limits::{Interruption, RunLimits};
use crate::core::retry::{Failure, RetryDecision, RetryPolicy};
use crate::domain::{ErrorStage, Operation, ProcessedItem, ProcessingError};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tokio::time::Instant;

/// Partition of one batch after a dispatch
///
/// Every operation handed to [`BatchDispatcher::dispatch`] ends up in exactly
/// one of `attempted`, `to_retry` or `unsent`.
#[derive(Debug)]
pub struct SingleBatchResult<I> {
    /// Operations that reached a terminal state (success or final failure)
    pub attempted: Vec<Operation<I>>,

    /// Operations eligible for an item-level retry, `retries_attempted`
    /// already incremented
    pub to_retry: Vec<Operation<I>>,

    /// Operations left unsettled because the run was interrupted during a
    /// whole-batch backoff; each carries the last transport error
    pub unsent: Vec<Operation<I>>,

    /// Set when `unsent` is non-empty
    pub interrupted: Option<Interruption>,

    /// HTTP calls made for this batch, including transport retries
    pub transport_attempts: u32,
}

impl<I> SingleBatchResult<I> {
    fn settled(attempted: Vec<Operation<I>>, transport_attempts: u32) -> Self {
        Self {
            attempted,
            to_retry: Vec::new(),
            unsent: Vec::new(),
            interrupted: None,
            transport_attempts,
        }
    }

    fn interrupted(
        unsent: Vec<Operation<I>>,
        interruption: Interruption,
        transport_attempts: u32,
    ) -> Self {
        Self {
            attempted: Vec::new(),
            to_retry: Vec::new(),
            unsent,
            interrupted: Some(interruption),
            transport_attempts,
        }
    }
}

/// How the whole-batch send loop ended
enum SendOutcome {
    Delivered(BatchResponse),
    Failed(ProcessingError),
    Interrupted(Interruption, ProcessingError),
}

/// Dispatches single batches against one endpoint
#[derive(Clone)]
pub struct BatchDispatcher {
    transport: Arc<dyn BatchTransport>,
    policy: RetryPolicy,
    encoder: BatchEncoder,
    batch_url: String,
}

impl BatchDispatcher {
    /// Create a dispatcher
    pub fn new(
        transport: Arc<dyn BatchTransport>,
        policy: RetryPolicy,
        batch_url: impl Into<String>,
        max_operations_per_batch: usize,
    ) -> Self {
        Self {
            transport,
            policy,
            encoder: BatchEncoder::new(max_operations_per_batch),
            batch_url: batch_url.into(),
        }
    }

    /// Retry policy shared with the orchestrator
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Maximum operations per batch
    pub fn max_operations(&self) -> usize {
        self.encoder.max_operations()
    }

    /// Dispatch one batch with no cancellation signal or deadline
    ///
    /// Never returns an error: every failure is recorded on the affected
    /// items, and the returned partition accounts for every operation.
    pub async fn dispatch<I, P>(
        &self,
        batch: Vec<Operation<I>>,
        credential: &SecretString,
        parser: &P,
    ) -> SingleBatchResult<I>
    where
        I: ProcessedItem,
        P: ResponseParser<I> + ?Sized,
    {
        self.dispatch_within(batch, credential, parser, &mut RunLimits::unbounded())
            .await
    }

    /// Dispatch one batch, abandoning whole-batch backoff on interruption
    ///
    /// When `limits` fires while waiting between transport attempts, no
    /// further request is made and the batch comes back in `unsent`.
    pub async fn dispatch_within<I, P>(
        &self,
        mut batch: Vec<Operation<I>>,
        credential: &SecretString,
        parser: &P,
        limits: &mut RunLimits,
    ) -> SingleBatchResult<I>
    where
        I: ProcessedItem,
        P: ResponseParser<I> + ?Sized,
    {
        if batch.is_empty() {
            return SingleBatchResult::settled(batch, 0);
        }

        let encoded = match self.encoder.encode(&batch) {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::error!(batch_size = batch.len(), error = %e, "Failed to encode batch");
                let error = ProcessingError::new(
                    ErrorStage::Format,
                    format!("Batch could not be encoded: {e}"),
                );
                mark_all(&mut batch, &error);
                return SingleBatchResult::settled(batch, 0);
            }
        };

        let request = BatchRequest {
            url: self.batch_url.clone(),
            content_type: encoded.content_type(),
            body: encoded.body,
        };

        let (outcome, transport_attempts) = self
            .send_with_retry(
                &request,
                credential.expose_secret().as_ref(),
                batch.len(),
                limits,
            )
            .await;

        let response = match outcome {
            SendOutcome::Delivered(response) => response,
            SendOutcome::Interrupted(interruption, error) => {
                tracing::warn!(
                    batch_size = batch.len(),
                    attempts = transport_attempts,
                    reason = ?interruption,
                    "Batch backoff interrupted, returning operations unsent"
                );
                mark_all(&mut batch, &error);
                return SingleBatchResult::interrupted(batch, interruption, transport_attempts);
            }
            SendOutcome::Failed(error) => {
                tracing::error!(
                    batch_size = batch.len(),
                    attempts = transport_attempts,
                    error = %error,
                    "Batch transport failed, marking every operation failed"
                );
                mark_all(&mut batch, &error);
                return SingleBatchResult::settled(batch, transport_attempts);
            }
        };

        let parts = match decode_batch_response(response.content_type.as_deref(), &response.body) {
            Ok(parts) => parts,
            Err(error) => {
                tracing::error!(
                    batch_size = batch.len(),
                    content_type = ?response.content_type,
                    error = %error,
                    "Batch response could not be framed, marking every operation failed"
                );
                let error = error
                    .with_status(response.status)
                    .with_status_text(response.status_text.clone());
                mark_all(&mut batch, &error);
                return SingleBatchResult::settled(batch, transport_attempts);
            }
        };

        let stats = apply_parts(parts, &mut batch, parser);
        tracing::debug!(
            matched = stats.matched,
            unmatched = stats.unmatched,
            duplicates = stats.duplicates,
            missing = stats.missing,
            malformed = stats.malformed,
            "Applied batch response parts"
        );

        let mut attempted = Vec::with_capacity(batch.len());
        let mut to_retry = Vec::new();
        for mut op in batch {
            if self
                .policy
                .should_retry_item(op.item.processing_error(), op.retries_attempted)
            {
                op.retries_attempted += 1;
                to_retry.push(op);
            } else {
                attempted.push(op);
            }
        }

        SingleBatchResult {
            attempted,
            to_retry,
            unsent: Vec::new(),
            interrupted: None,
            transport_attempts,
        }
    }

    /// POST with whole-batch retries
    ///
    /// Returns the 2xx response, the transport error to record on every
    /// operation once the failure is terminal or the budget is spent, or the
    /// last error when `limits` fired during a backoff. The second value is
    /// the number of HTTP calls made.
    async fn send_with_retry(
        &self,
        request: &BatchRequest,
        bearer_token: &str,
        batch_size: usize,
        limits: &mut RunLimits,
    ) -> (SendOutcome, u32) {
        let mut retries = 0u32;

        loop {
            crate::log_batch_dispatch!(batch_size, request.url, retries + 1);

            let (error, decision) = match self.transport.send(request, bearer_token).await {
                Ok(response) if response.is_success() => {
                    return (SendOutcome::Delivered(response), retries + 1)
                }
                Ok(response) => {
                    let decision = self
                        .policy
                        .decide(Failure::BatchStatus(response.status), retries);
                    (batch_status_error(response), decision)
                }
                Err(e) => {
                    let decision = self.policy.decide(Failure::Transport(&e), retries);
                    (ProcessingError::new(ErrorStage::Transport, e.to_string()), decision)
                }
            };

            match decision {
                RetryDecision::Retry { delay } => {
                    retries += 1;
                    tracing::warn!(
                        attempt = retries,
                        max_retries = self.policy.max_retries(),
                        status_code = ?error.status_code(),
                        delay_ms = delay.as_millis() as u64,
                        reason = %error.message,
                        "Retrying batch request"
                    );
                    if let Some(interruption) = limits.sleep_until(Instant::now() + delay).await {
                        return (SendOutcome::Interrupted(interruption, error), retries);
                    }
                }
                RetryDecision::Stop => {
                    let attempts = retries + 1;
                    let message = format!(
                        "Batch request failed after {attempts} attempt(s): {}",
                        error.message
                    );
                    return (
                        SendOutcome::Failed(ProcessingError { message, ..error }),
                        attempts,
                    );
                }
            }
        }
    }
}

fn batch_status_error(response: BatchResponse) -> ProcessingError {
    let mut error = ProcessingError::new(
        ErrorStage::Transport,
        format!("Batch endpoint returned HTTP {}", response.status),
    )
    .with_status(response.status)
    .with_status_text(response.status_text);

    if let Ok(body) = serde_json::from_str(&response.body) {
        error = error.with_body(body);
    }
    error
}

fn mark_all<I: ProcessedItem>(batch: &mut [Operation<I>], error: &ProcessingError) {
    for op in batch.iter_mut() {
        op.item
            .record_error(error.clone().with_correlation_id(op.id.clone()));
    }
}
