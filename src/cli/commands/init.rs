//! `init` command

use clap::Args;
use std::fs;
use std::path::Path;

const SAMPLE_CONFIG: &str = r#"# classroom-batch configuration
#
# Values may reference environment variables as ${VAR_NAME}. Any setting can
# also be overridden with CLASSROOM_BATCH_<SECTION>_<KEY>, for example
# CLASSROOM_BATCH_RETRY_MAX_RETRIES=5.

[application]
log_level = "info"
# Encode batches and report their sizes without sending anything
dry_run = false

[endpoint]
# classroom (50 ops/batch), drive (100), forms (50) or custom
api = "classroom"
# Required for api = "custom"; overrides the default URL otherwise
# batch_url = "https://classroom.googleapis.com/batch"
# Defaults to the API's limit
# max_operations_per_batch = 50
timeout_seconds = 60

[auth]
# OAuth access token obtained outside this tool
access_token = "${CLASSROOM_ACCESS_TOKEN}"

[retry]
max_retries = 3
initial_delay_ms = 1000
backoff_factor = 2.0
max_delay_ms = 60000
max_jitter_ms = 1000
retryable_status_codes = [429, 500, 502, 503, 504]

[run]
# Abort pending operations after this many seconds
# deadline_seconds = 900

[logging]
local_enabled = false
local_path = "logs"
# daily, hourly or never
local_rotation = "daily"
"#;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "classroom-batch.toml")]
    pub output: String,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2);
        }

        match fs::write(&self.output, SAMPLE_CONFIG) {
            Ok(()) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Export CLASSROOM_ACCESS_TOKEN or put it in a .env file");
                println!("  2. Validate configuration: classroom-batch validate-config");
                println!("  3. Run a manifest: classroom-batch run --operations ops.json");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(5)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClassroomBatchConfig;
    use tempfile::TempDir;

    #[test]
    fn test_sample_config_parses_and_validates() {
        let text = SAMPLE_CONFIG.replace("${CLASSROOM_ACCESS_TOKEN}", "token");
        let config: ClassroomBatchConfig = toml::from_str(&text).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.endpoint.resolved_batch_size(), 50);
    }

    #[tokio::test]
    async fn test_init_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cfg.toml");
        fs::write(&path, "existing").unwrap();

        let args = InitArgs {
            output: path.to_string_lossy().to_string(),
            force: false,
        };
        assert_eq!(args.execute().await.unwrap(), 2);
        assert_eq!(fs::read_to_string(&path).unwrap(), "existing");

        let forced = InitArgs {
            force: true,
            ..args
        };
        assert_eq!(forced.execute().await.unwrap(), 0);
        assert!(fs::read_to_string(&path).unwrap().contains("[retry]"));
    }
}
