//! Configuration management for classroom-batch.
//!
//! TOML configuration with `${VAR_NAME}` substitution, `CLASSROOM_BATCH_*`
//! environment overrides and validation on load.
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level and dry-run switch
//! - [`EndpointConfig`] - Target API, batch URL and batch size
//! - [`AuthConfig`] - Bearer access token
//! - [`RetryConfig`] - Backoff, jitter and retryable status codes
//! - [`RunConfig`] - Wall-clock deadline
//! - [`LoggingConfig`] - Local JSON log files
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [endpoint]
//! api = "classroom"
//! max_operations_per_batch = 50
//!
//! [auth]
//! access_token = "${CLASSROOM_ACCESS_TOKEN}"
//!
//! [retry]
//! max_retries = 3
//! initial_delay_ms = 1000
//! backoff_factor = 2.0
//! retryable_status_codes = [429, 500, 502, 503, 504]
//! ```
//!
//! # Loading
//!
//! ```rust,no_run
//! use classroom_batch::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("classroom-batch.toml")?;
//! println!("Batch URL: {:?}", config.endpoint.resolved_batch_url());
//! # Ok(())
//! # }
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::load_config;
pub use schema::{
    ApplicationConfig, AuthConfig, ClassroomBatchConfig, EndpointConfig, LoggingConfig,
    RetryConfig, RunConfig,
};
pub use secret::{secret_string, secret_string_opt, SecretString, SecretValue};
