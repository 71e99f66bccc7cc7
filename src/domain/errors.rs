//! Domain error types
//!
//! Errors returned from fallible crate APIs. Per-operation failures are not
//! errors in this sense: they are recorded on the processed item as a
//! [`ProcessingError`](super::item::ProcessingError) and the run carries on.

use thiserror::Error;

/// Main crate error type
#[derive(Debug, Error)]
pub enum BatchError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No bearer credential was supplied; the run never starts
    #[error("Missing credential: {0}")]
    MissingCredential(String),

    /// Batch transport errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// Errors raised by a batch transport
///
/// These don't expose third-party HTTP client types.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Could not reach the batch endpoint
    #[error("Failed to connect to batch endpoint: {0}")]
    ConnectionFailed(String),

    /// The request timed out
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// The response body could not be read
    #[error("Failed to read response body: {0}")]
    BodyRead(String),

    /// The client could not be built
    #[error("HTTP client setup failed: {0}")]
    ClientSetup(String),
}

// Conversion from std::io::Error
impl From<std::io::Error> for BatchError {
    fn from(err: std::io::Error) -> Self {
        BatchError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for BatchError {
    fn from(err: serde_json::Error) -> Self {
        BatchError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for BatchError {
    fn from(err: toml::de::Error) -> Self {
        BatchError::Configuration(format!("TOML parse error: {err}"))
    }
}
