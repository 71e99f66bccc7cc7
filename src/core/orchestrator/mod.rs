//! Orchestration loop
//!
//! Owns the work queue for a run, carves it into batches, and re-enqueues
//! retryable operations after their backoff delay.
//!
//! # Example
//!
//! ```rust,no_run
//! use classroom_batch::adapters::google::GoogleApiParser;
//! use classroom_batch::adapters::http::ReqwestTransport;
//! use classroom_batch::config::{load_config, secret_string};
//! use classroom_batch::core::orchestrator::{Orchestrator, OrchestratorSettings};
//! use classroom_batch::domain::{CorrelationToken, HttpMethod, MigrationItem, Operation};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("classroom-batch.toml")?;
//! let transport = Arc::new(ReqwestTransport::from_config(&config.endpoint)?);
//! let orchestrator = Orchestrator::new(transport, OrchestratorSettings::from_config(&config)?);
//!
//! let op = Operation::new(
//!     CorrelationToken::generate(),
//!     HttpMethod::Post,
//!     "/v1/courses/123/topics",
//!     serde_json::json!({"name": "Week 1"}),
//!     MigrationItem::new("topic-week-1"),
//! );
//!
//! let token = secret_string("ya29.token".to_string());
//! let report = orchestrator
//!     .run(vec![op], &GoogleApiParser, Some(&token), None)
//!     .await?;
//! println!("succeeded: {}", report.summary.succeeded);
//! # Ok(())
//! # }
//! ```

pub mod runner;
pub mod schedule;
pub mod summary;

pub use runner::{Orchestrator, OrchestratorSettings};
pub use schedule::RetrySchedule;
pub use summary::{RunReport, RunSummary};
