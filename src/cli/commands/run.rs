//! `run` command
//!
//! Loads a JSON manifest of operations, runs it through the batch endpoint
//! and writes one result record per operation.

use crate::adapters::google::GoogleApiParser;
use crate::adapters::http::ReqwestTransport;
use crate::config::load_config;
use crate::core::batch::BatchEncoder;
use crate::core::orchestrator::{Orchestrator, OrchestratorSettings};
use crate::domain::{BatchError, MigrationItem, Operation, OperationRequest};
use anyhow::Context;
use clap::Args;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// JSON file holding an array of `{id?, method, path, body?}` operations
    #[arg(short = 'f', long)]
    pub operations: PathBuf,

    /// Write results here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Encode batches and report them without sending anything
    #[arg(long)]
    pub dry_run: bool,

    /// Override operations per batch
    #[arg(long)]
    pub batch_size: Option<usize>,
}

impl RunArgs {
    /// Execute the run command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting run command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Configuration error: {e}");
                return Ok(2);
            }
        };

        if let Some(size) = self.batch_size {
            tracing::info!(batch_size = size, "Overriding batch size from CLI");
            config.endpoint.max_operations_per_batch = Some(size);
            if let Err(e) = config.validate() {
                eprintln!("Configuration validation failed: {e}");
                return Ok(2);
            }
        }

        let operations = load_manifest(&self.operations)?;
        tracing::info!(
            operations = operations.len(),
            manifest = %self.operations.display(),
            "Loaded operations manifest"
        );

        let settings = OrchestratorSettings::from_config(&config)?;

        if self.dry_run || config.application.dry_run {
            return dry_run(&operations, &settings);
        }

        let transport = Arc::new(ReqwestTransport::from_config(&config.endpoint)?);
        let orchestrator = Orchestrator::new(transport, settings);

        let report = match orchestrator
            .run(
                operations,
                &GoogleApiParser,
                config.auth.access_token.as_ref(),
                Some(shutdown_signal),
            )
            .await
        {
            Ok(report) => report,
            Err(e @ (BatchError::MissingCredential(_) | BatchError::Validation(_))) => {
                tracing::error!(error = %e, "Run could not start");
                eprintln!("Run could not start: {e}");
                return Ok(2);
            }
            Err(e) => return Err(e.into()),
        };

        write_results(&report.items, self.output.as_deref())?;

        let summary = &report.summary;
        println!();
        println!("📊 Run Summary");
        println!("  Operations: {}", summary.total_operations);
        println!("  Succeeded:  {}", summary.succeeded);
        println!("  Failed:     {}", summary.failed);
        println!("  Batches:    {}", summary.batches_dispatched);
        println!("  Retries:    {}", summary.retries_scheduled);
        for (stage, count) in &summary.failures_by_stage {
            println!("    {stage}: {count}");
        }
        println!("  Duration:   {:.2}s", summary.duration.as_secs_f64());

        Ok(if summary.is_successful() { 0 } else { 1 })
    }
}

fn load_manifest(path: &Path) -> anyhow::Result<Vec<Operation<MigrationItem>>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read operations manifest {}", path.display()))?;
    let requests: Vec<OperationRequest> = serde_json::from_str(&text)
        .with_context(|| format!("Invalid operations manifest {}", path.display()))?;

    requests
        .into_iter()
        .enumerate()
        .map(|(idx, request)| {
            request
                .into_operation()
                .map_err(|e| anyhow::anyhow!("Manifest entry {idx}: {e}"))
        })
        .collect()
}

fn dry_run(
    operations: &[Operation<MigrationItem>],
    settings: &OrchestratorSettings,
) -> anyhow::Result<i32> {
    tracing::info!("Dry run mode enabled - no batches will be sent");
    println!("🔍 DRY RUN MODE - batches are encoded but not sent");
    println!("  Endpoint: {}", settings.batch_url);

    let encoder = BatchEncoder::new(settings.max_operations_per_batch);
    for (idx, chunk) in operations
        .chunks(settings.max_operations_per_batch.max(1))
        .enumerate()
    {
        let encoded = encoder.encode(chunk)?;
        println!(
            "  Batch {}: {} operation(s), {} bytes",
            idx + 1,
            encoded.operation_count,
            encoded.body.len()
        );
    }
    Ok(0)
}

fn write_results(items: &[MigrationItem], output: Option<&Path>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(items)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write results to {}", path.display()))?;
            tracing::info!(path = %path.display(), "Results written");
        }
        None => println!("{json}"),
    }
    Ok(())
}
