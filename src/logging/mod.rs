//! Logging and observability
//!
//! Structured logging via `tracing`:
//! - console output filtered by log level or `RUST_LOG`
//! - optional JSON log files with rotation
//!
//! # Example
//!
//! ```no_run
//! use classroom_batch::config::LoggingConfig;
//! use classroom_batch::logging::init_logging;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log one batch being handed to the transport
///
/// # Example
///
/// ```no_run
/// use classroom_batch::log_batch_dispatch;
///
/// log_batch_dispatch!(50, "https://classroom.googleapis.com/batch", 1);
/// ```
#[macro_export]
macro_rules! log_batch_dispatch {
    ($batch_size:expr, $url:expr, $attempt:expr) => {
        tracing::info!(
            batch_size = $batch_size,
            url = %$url,
            attempt = $attempt,
            "Dispatching batch"
        );
    };
}

/// Log an operation being scheduled for a delayed retry
///
/// # Example
///
/// ```no_run
/// use classroom_batch::log_retry_scheduled;
/// use std::time::Duration;
///
/// log_retry_scheduled!("op-1", 1, Duration::from_millis(1500), Some(429u16));
/// ```
#[macro_export]
macro_rules! log_retry_scheduled {
    ($correlation_id:expr, $retry:expr, $delay:expr, $status_code:expr) => {
        tracing::warn!(
            correlation_id = %$correlation_id,
            retry = $retry,
            delay_ms = $delay.as_millis() as u64,
            status_code = ?$status_code,
            "Scheduling operation retry"
        );
    };
}

/// Log the end of a run
///
/// # Example
///
/// ```no_run
/// use classroom_batch::log_run_complete;
/// use std::time::Duration;
///
/// log_run_complete!(10, 9, 1, Duration::from_secs(3));
/// ```
#[macro_export]
macro_rules! log_run_complete {
    ($total:expr, $succeeded:expr, $failed:expr, $duration:expr) => {
        tracing::info!(
            total = $total,
            succeeded = $succeeded,
            failed = $failed,
            duration_ms = $duration.as_millis() as u64,
            "Batch run completed"
        );
    };
}
