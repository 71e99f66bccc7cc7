//! Configuration schema types
//!
//! This module defines the configuration structure that maps to the TOML file.

use crate::adapters::google::GoogleApi;
use crate::config::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Main classroom-batch configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassroomBatchConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Batch endpoint selection
    pub endpoint: EndpointConfig,

    /// Bearer credential
    #[serde(default)]
    pub auth: AuthConfig,

    /// Retry policy for transport and item retries
    #[serde(default)]
    pub retry: RetryConfig,

    /// Run-level limits
    #[serde(default)]
    pub run: RunConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ClassroomBatchConfig {
    /// Validates the configuration
    ///
    /// The access token is deliberately not required here: a missing
    /// credential is reported by the run itself, before any dispatch.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.endpoint.validate()?;
        self.retry.validate()?;
        self.run.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Dry run mode (encode batches but never send them)
    #[serde(default)]
    pub dry_run: bool,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            dry_run: false,
        }
    }
}

/// Batch endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Target API; selects the default batch URL and batch size limit
    #[serde(default)]
    pub api: GoogleApi,

    /// Explicit batch URL (required for `custom`, overrides the default otherwise)
    #[serde(default)]
    pub batch_url: Option<String>,

    /// Operations per batch (defaults to the API's limit)
    #[serde(default)]
    pub max_operations_per_batch: Option<usize>,

    /// HTTP timeout per batch call in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl EndpointConfig {
    /// Batch URL after applying the API default
    pub fn resolved_batch_url(&self) -> Option<String> {
        self.batch_url
            .clone()
            .or_else(|| self.api.batch_url().map(str::to_string))
    }

    /// Operations per batch after applying the API default
    pub fn resolved_batch_size(&self) -> usize {
        self.max_operations_per_batch
            .unwrap_or_else(|| self.api.max_batch_size())
    }

    fn validate(&self) -> Result<(), String> {
        let batch_url = self.resolved_batch_url().ok_or_else(|| {
            "endpoint.batch_url is required when endpoint.api = 'custom'".to_string()
        })?;

        let parsed = url::Url::parse(&batch_url)
            .map_err(|e| format!("endpoint.batch_url '{batch_url}' is not a valid URL: {e}"))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err("endpoint.batch_url must start with http:// or https://".to_string());
        }

        let batch_size = self.resolved_batch_size();
        let limit = self.api.max_batch_size();
        if batch_size == 0 || batch_size > limit {
            return Err(format!(
                "endpoint.max_operations_per_batch must be between 1 and {limit} for {}, got {batch_size}",
                self.api
            ));
        }

        if self.timeout_seconds == 0 {
            return Err("endpoint.timeout_seconds must be > 0".to_string());
        }

        Ok(())
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            api: GoogleApi::default(),
            batch_url: None,
            max_operations_per_batch: None,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// Bearer credential configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// OAuth access token, acquired outside this tool
    /// Stored securely in memory and automatically zeroized on drop
    #[serde(default)]
    pub access_token: Option<SecretString>,
}

/// Retry configuration
///
/// Shared by the transport layer (whole-batch retries) and the item layer
/// (per-operation re-enqueue). The two layers count attempts independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Backoff multiplier
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,

    /// Maximum delay in milliseconds (before jitter)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Upper bound of the random jitter added to each delay
    #[serde(default = "default_max_jitter_ms")]
    pub max_jitter_ms: u64,

    /// Status codes that make a failure retryable
    #[serde(default = "default_retryable_status_codes")]
    pub retryable_status_codes: BTreeSet<u16>,
}

impl RetryConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_retries > 10 {
            return Err(format!(
                "retry.max_retries must be <= 10, got {}",
                self.max_retries
            ));
        }

        if !self.backoff_factor.is_finite() || self.backoff_factor < 1.0 {
            return Err(format!(
                "retry.backoff_factor must be >= 1.0, got {}",
                self.backoff_factor
            ));
        }

        if self.max_delay_ms < self.initial_delay_ms {
            return Err(format!(
                "retry.max_delay_ms ({}) must be >= retry.initial_delay_ms ({})",
                self.max_delay_ms, self.initial_delay_ms
            ));
        }

        if let Some(code) = self
            .retryable_status_codes
            .iter()
            .find(|c| !(100..=599).contains(*c))
        {
            return Err(format!(
                "retry.retryable_status_codes contains invalid HTTP status {code}"
            ));
        }

        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            backoff_factor: default_backoff_factor(),
            max_delay_ms: default_max_delay_ms(),
            max_jitter_ms: default_max_jitter_ms(),
            retryable_status_codes: default_retryable_status_codes(),
        }
    }
}

/// Run-level limits
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    /// Wall-clock deadline for one run in seconds (none = unbounded)
    #[serde(default)]
    pub deadline_seconds: Option<u64>,
}

impl RunConfig {
    fn validate(&self) -> Result<(), String> {
        if self.deadline_seconds == Some(0) {
            return Err("run.deadline_seconds must be > 0 when set".to_string());
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local JSON file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy (daily, hourly, never)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty when local_enabled = true".to_string());
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout_seconds() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_max_delay_ms() -> u64 {
    60_000
}

fn default_max_jitter_ms() -> u64 {
    1000
}

fn default_retryable_status_codes() -> BTreeSet<u16> {
    [429, 500, 502, 503, 504].into_iter().collect()
}

fn default_local_path() -> String {
    "logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}
