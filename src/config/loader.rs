//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::ClassroomBatchConfig;
use super::secret::secret_string;
use crate::domain::errors::BatchError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into ClassroomBatchConfig
/// 4. Applies environment variable overrides (CLASSROOM_BATCH_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if the file cannot be read, a referenced environment
/// variable is missing, TOML parsing fails, or validation fails.
///
/// # Examples
///
/// ```no_run
/// use classroom_batch::config::loader::load_config;
///
/// let config = load_config("classroom-batch.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<ClassroomBatchConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(BatchError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        BatchError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: ClassroomBatchConfig = toml::from_str(&contents)
        .map_err(|e| BatchError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config);

    config.validate().map_err(|e| {
        BatchError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("env var pattern is a valid regex")
    })
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = env_var_pattern();
    let mut lines = Vec::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_string());
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{var_name}}}");
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        lines.push(processed_line);
    }

    if !missing_vars.is_empty() {
        return Err(BatchError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(lines.join("\n"))
}

/// Applies environment variable overrides using the CLASSROOM_BATCH_* prefix
///
/// Variables follow the pattern `CLASSROOM_BATCH_<SECTION>_<KEY>`, for example
/// `CLASSROOM_BATCH_ENDPOINT_BATCH_URL` or `CLASSROOM_BATCH_RETRY_MAX_RETRIES`.
/// Unparseable numeric values are ignored.
fn apply_env_overrides(config: &mut ClassroomBatchConfig) {
    // Application overrides
    if let Ok(val) = std::env::var("CLASSROOM_BATCH_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("CLASSROOM_BATCH_APPLICATION_DRY_RUN") {
        config.application.dry_run = val.parse().unwrap_or(false);
    }

    // Endpoint overrides
    if let Ok(val) = std::env::var("CLASSROOM_BATCH_ENDPOINT_BATCH_URL") {
        config.endpoint.batch_url = Some(val);
    }
    if let Ok(val) = std::env::var("CLASSROOM_BATCH_ENDPOINT_MAX_OPERATIONS_PER_BATCH") {
        if let Ok(size) = val.parse() {
            config.endpoint.max_operations_per_batch = Some(size);
        }
    }
    if let Ok(val) = std::env::var("CLASSROOM_BATCH_ENDPOINT_TIMEOUT_SECONDS") {
        if let Ok(timeout) = val.parse() {
            config.endpoint.timeout_seconds = timeout;
        }
    }

    // Auth overrides
    if let Ok(val) = std::env::var("CLASSROOM_BATCH_AUTH_ACCESS_TOKEN") {
        config.auth.access_token = Some(secret_string(val));
    }

    // Retry overrides
    if let Ok(val) = std::env::var("CLASSROOM_BATCH_RETRY_MAX_RETRIES") {
        if let Ok(retries) = val.parse() {
            config.retry.max_retries = retries;
        }
    }
    if let Ok(val) = std::env::var("CLASSROOM_BATCH_RETRY_INITIAL_DELAY_MS") {
        if let Ok(delay) = val.parse() {
            config.retry.initial_delay_ms = delay;
        }
    }
    if let Ok(val) = std::env::var("CLASSROOM_BATCH_RETRY_BACKOFF_FACTOR") {
        if let Ok(factor) = val.parse() {
            config.retry.backoff_factor = factor;
        }
    }

    // Run overrides
    if let Ok(val) = std::env::var("CLASSROOM_BATCH_RUN_DEADLINE_SECONDS") {
        if let Ok(deadline) = val.parse() {
            config.run.deadline_seconds = Some(deadline);
        }
    }

    // Logging overrides
    if let Ok(val) = std::env::var("CLASSROOM_BATCH_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("CLASSROOM_BATCH_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
}
