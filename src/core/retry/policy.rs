//! Retry policy shared by the transport and item layers
//!
//! Every retry decision in the engine goes through [`RetryPolicy::classify`],
//! so the transport loop, the dispatcher's per-item partition and the
//! orchestrator's delay scheduling agree on what is retryable.

use crate::config::RetryConfig;
use crate::domain::{ProcessingError, TransportError};
use rand::Rng;
use std::time::Duration;

/// Failure presented to the policy
#[derive(Debug, Clone, Copy)]
pub enum Failure<'a> {
    /// The batch call never produced an HTTP response
    Transport(&'a TransportError),
    /// The batch call answered with a non-2xx status
    BatchStatus(u16),
    /// A processed item carries this failure
    Item(&'a ProcessingError),
}

/// Whether a failure may be retried at all
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Retryable,
    Terminal,
}

/// Outcome of a retry decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait `delay`, then try again
    Retry { delay: Duration },
    /// Stop; the failure is final
    Stop,
}

/// Exponential backoff with bounded jitter
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Create a new policy from configuration
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Underlying configuration
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Maximum retries per layer
    pub fn max_retries(&self) -> u32 {
        self.config.max_retries
    }

    /// Whether `status` is in the configured retryable set
    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.config.retryable_status_codes.contains(&status)
    }

    /// Classifies a failure
    ///
    /// - transport errors are retryable unless the client itself is broken
    /// - batch statuses are retryable when configured or any 5xx
    /// - item failures are retryable when their status code is in the
    ///   configured set, whichever stage recorded them
    pub fn classify(&self, failure: Failure<'_>) -> FailureClass {
        let retryable = match failure {
            Failure::Transport(TransportError::ClientSetup(_)) => false,
            Failure::Transport(_) => true,
            Failure::BatchStatus(status) => {
                self.is_retryable_status(status) || (500..600).contains(&status)
            }
            Failure::Item(error) => error
                .status_code()
                .map(|code| self.is_retryable_status(code))
                .unwrap_or(false),
        };

        if retryable {
            FailureClass::Retryable
        } else {
            FailureClass::Terminal
        }
    }

    /// Decide what to do after a failure
    ///
    /// `attempts_made` counts retries already performed at this layer; the
    /// returned delay is for retry number `attempts_made + 1`.
    pub fn decide(&self, failure: Failure<'_>, attempts_made: u32) -> RetryDecision {
        if self.classify(failure) == FailureClass::Terminal
            || attempts_made >= self.config.max_retries
        {
            return RetryDecision::Stop;
        }
        RetryDecision::Retry {
            delay: self.delay_for(attempts_made + 1),
        }
    }

    /// Whether an item should go back on the queue
    ///
    /// Items without an error succeeded and are never retried.
    pub fn should_retry_item(&self, error: Option<&ProcessingError>, retries_attempted: u32) -> bool {
        match error {
            Some(error) => matches!(
                self.decide(Failure::Item(error), retries_attempted),
                RetryDecision::Retry { .. }
            ),
            None => false,
        }
    }

    /// Delay before the n-th retry, without jitter
    ///
    /// `initial_delay_ms * backoff_factor^(n-1)`, capped at `max_delay_ms`.
    /// `n = 0` is treated as the first retry.
    pub fn base_delay(&self, retry_number: u32) -> Duration {
        let exponent = retry_number.saturating_sub(1).min(i32::MAX as u32) as i32;
        let raw = self.config.initial_delay_ms as f64 * self.config.backoff_factor.powi(exponent);
        let capped = raw.min(self.config.max_delay_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }

    /// Delay before the n-th retry, with jitter
    pub fn delay_for(&self, retry_number: u32) -> Duration {
        self.base_delay(retry_number) + self.jitter()
    }

    fn jitter(&self) -> Duration {
        if self.config.max_jitter_ms == 0 {
            return Duration::ZERO;
        }
        let ms = rand::thread_rng().gen_range(0..=self.config.max_jitter_ms);
        Duration::from_millis(ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}
