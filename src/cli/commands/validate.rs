//! `validate-config` command

use crate::config::load_config;
use clap::Args;
use secrecy::ExposeSecret;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config validates after applying overrides
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration is invalid");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let token_state = match config.auth.access_token.as_ref() {
            Some(token) if !token.expose_secret().is_blank() => "set",
            _ => "missing (runs will fail before dispatch)",
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Dry Run: {}", config.application.dry_run);
        println!("  API: {}", config.endpoint.api);
        println!(
            "  Batch URL: {}",
            config.endpoint.resolved_batch_url().unwrap_or_default()
        );
        println!("  Batch Size: {}", config.endpoint.resolved_batch_size());
        println!("  Timeout: {}s", config.endpoint.timeout_seconds);
        println!("  Access Token: {token_state}");
        println!(
            "  Retries: {} (initial {} ms, factor {}, cap {} ms, jitter {} ms)",
            config.retry.max_retries,
            config.retry.initial_delay_ms,
            config.retry.backoff_factor,
            config.retry.max_delay_ms,
            config.retry.max_jitter_ms
        );
        println!(
            "  Retryable Status Codes: {:?}",
            config.retry.retryable_status_codes
        );
        match config.run.deadline_seconds {
            Some(secs) => println!("  Deadline: {secs}s"),
            None => println!("  Deadline: none"),
        }
        println!();
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_validate_reports_missing_file() {
        let code = ValidateArgs {}
            .execute("/nonexistent/classroom-batch.toml")
            .await
            .unwrap();
        assert_eq!(code, 2);
    }

    #[tokio::test]
    async fn test_validate_accepts_minimal_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[endpoint]\napi = \"forms\"").unwrap();

        let code = ValidateArgs {}
            .execute(file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(code, 0);
    }
}
