// classroom-batch - Batched content migration for Google Classroom
// Copyright (c) 2025 classroom-batch Contributors
// Licensed under the MIT License

//! # classroom-batch
//!
//! Batch-RPC engine for migrating course content into Google Classroom,
//! Drive and Forms. Many independent create/update calls are packed into
//! `multipart/mixed` batch requests; each sub-response is correlated back to
//! its operation, failures are classified, and retryable operations are
//! re-queued with exponential backoff and jitter until every operation is
//! settled.
//!
//! ## Architecture
//!
//! - [`domain`] - operations, processed items, structured errors
//! - [`core`] - retry policy, multipart codec, dispatcher, orchestration loop
//! - [`adapters`] - HTTP transport and Google endpoint support
//! - [`config`] - TOML configuration with environment overrides
//! - [`logging`] - `tracing` subscriber setup and logging macros
//! - [`cli`] - command-line interface
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use classroom_batch::adapters::google::GoogleApiParser;
//! use classroom_batch::adapters::http::ReqwestTransport;
//! use classroom_batch::config::{load_config, secret_string};
//! use classroom_batch::core::orchestrator::{Orchestrator, OrchestratorSettings};
//! use classroom_batch::domain::{CorrelationToken, HttpMethod, MigrationItem, Operation};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("classroom-batch.toml")?;
//!     let transport = Arc::new(ReqwestTransport::from_config(&config.endpoint)?);
//!     let orchestrator =
//!         Orchestrator::new(transport, OrchestratorSettings::from_config(&config)?);
//!
//!     let operations = (1..=3)
//!         .map(|week| {
//!             Operation::new(
//!                 CorrelationToken::generate(),
//!                 HttpMethod::Post,
//!                 "/v1/courses/123/topics",
//!                 serde_json::json!({"name": format!("Week {week}")}),
//!                 MigrationItem::new(format!("topic-{week}")),
//!             )
//!         })
//!         .collect();
//!
//!     let token = secret_string(std::env::var("CLASSROOM_ACCESS_TOKEN")?);
//!     let report = orchestrator
//!         .run(operations, &GoogleApiParser, Some(&token), None)
//!         .await?;
//!
//!     for item in &report.items {
//!         match &item.processing_error {
//!             Some(error) => println!("{}: {error}", item.source_id),
//!             None => println!("{}: created {:?}", item.source_id, item.remote_id),
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Custom response parsers
//!
//! Any `Fn(&mut I, &Value, u16, &str, &CorrelationToken)` closure is a
//! [`ResponseParser`](core::batch::ResponseParser), so callers with their own
//! item types only need to implement
//! [`ProcessedItem`](domain::ProcessedItem).

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
