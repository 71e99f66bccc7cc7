//! Processed items and their structured failures
//!
//! A processed item is the record the caller cares about after a run. The
//! engine only ever reads and writes its processing-error slot; every other
//! field belongs to the response parser.

use super::ids::CorrelationToken;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Where in the pipeline a failure was recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStage {
    /// The run could not start (missing credential, bad settings)
    Precondition,
    /// The batch HTTP call itself failed
    Transport,
    /// The batch response could not be framed or correlated
    Format,
    /// The API answered the sub-request with a failure
    Item,
    /// The orchestration loop gave up (iteration ceiling)
    Orchestration,
    /// The run was cancelled before the operation settled
    Cancelled,
    /// The run deadline elapsed before the operation settled
    Deadline,
}

impl fmt::Display for ErrorStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorStage::Precondition => "precondition",
            ErrorStage::Transport => "transport",
            ErrorStage::Format => "format",
            ErrorStage::Item => "item",
            ErrorStage::Orchestration => "orchestration",
            ErrorStage::Cancelled => "cancelled",
            ErrorStage::Deadline => "deadline",
        };
        write!(f, "{s}")
    }
}

/// Structured context attached to a [`ProcessingError`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// HTTP status code of the sub-response or batch response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,

    /// HTTP reason phrase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,

    /// Parsed response body, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,

    /// Token of the operation the failure belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<CorrelationToken>,
}

/// Failure recorded on a processed item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingError {
    /// Human-readable description
    pub message: String,

    /// Pipeline stage that produced the failure
    pub stage: ErrorStage,

    /// Structured details (status code drives item-level retry)
    #[serde(default)]
    pub details: ErrorDetails,
}

impl ProcessingError {
    /// Creates a new error without details
    pub fn new(stage: ErrorStage, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stage,
            details: ErrorDetails::default(),
        }
    }

    /// Sets the status code
    pub fn with_status(mut self, status_code: u16) -> Self {
        self.details.status_code = Some(status_code);
        self
    }

    /// Sets the reason phrase
    pub fn with_status_text(mut self, status_text: impl Into<String>) -> Self {
        self.details.status_text = Some(status_text.into());
        self
    }

    /// Sets the response body
    pub fn with_body(mut self, body: Value) -> Self {
        self.details.body = Some(body);
        self
    }

    /// Sets the correlation token
    pub fn with_correlation_id(mut self, id: CorrelationToken) -> Self {
        self.details.correlation_id = Some(id);
        self
    }

    /// Status code carried in the details, if any
    pub fn status_code(&self) -> Option<u16> {
        self.details.status_code
    }
}

impl fmt::Display for ProcessingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.details.status_code {
            Some(code) => write!(f, "[{}] {} (status {})", self.stage, self.message, code),
            None => write!(f, "[{}] {}", self.stage, self.message),
        }
    }
}

/// Result record the engine drives to a terminal state
///
/// Implementors keep whatever success fields they need; the engine reads
/// [`processing_error`](ProcessedItem::processing_error) to decide whether an
/// operation succeeded, failed, or may be retried.
pub trait ProcessedItem: Send {
    /// Current failure, if any
    fn processing_error(&self) -> Option<&ProcessingError>;

    /// Records a failure, replacing any previous one
    fn record_error(&mut self, error: ProcessingError);

    /// Clears the failure before the operation is attempted again
    fn clear_error(&mut self);

    /// Whether the item currently carries a failure
    fn is_failed(&self) -> bool {
        self.processing_error().is_some()
    }
}

/// Concrete processed item used by the CLI and the Google response parser
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MigrationItem {
    /// Local identifier of the migrated content (mirrors the correlation token)
    pub source_id: String,

    /// Identifier assigned by the remote API on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,

    /// Successful response body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,

    /// Failure, if the operation did not succeed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_error: Option<ProcessingError>,
}

impl MigrationItem {
    /// Creates an item for the given source identifier
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            ..Default::default()
        }
    }
}

impl ProcessedItem for MigrationItem {
    fn processing_error(&self) -> Option<&ProcessingError> {
        self.processing_error.as_ref()
    }

    fn record_error(&mut self, error: ProcessingError) {
        self.processing_error = Some(error);
    }

    fn clear_error(&mut self) {
        self.processing_error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processing_error_builder() {
        let id = CorrelationToken::new("op-1").unwrap();
        let err = ProcessingError::new(ErrorStage::Item, "Batch item failed")
            .with_status(429)
            .with_status_text("Too Many Requests")
            .with_body(serde_json::json!({"error": {"code": 429}}))
            .with_correlation_id(id.clone());

        assert_eq!(err.status_code(), Some(429));
        assert_eq!(err.details.status_text.as_deref(), Some("Too Many Requests"));
        assert_eq!(err.details.correlation_id, Some(id));
        assert_eq!(err.to_string(), "[item] Batch item failed (status 429)");
    }

    #[test]
    fn test_processing_error_display_without_status() {
        let err = ProcessingError::new(ErrorStage::Format, "Missing boundary");
        assert_eq!(err.to_string(), "[format] Missing boundary");
    }

    #[test]
    fn test_migration_item_error_slot() {
        let mut item = MigrationItem::new("announcement-3");
        assert!(!item.is_failed());

        item.record_error(ProcessingError::new(ErrorStage::Transport, "boom"));
        assert!(item.is_failed());
        assert_eq!(
            item.processing_error().map(|e| e.stage),
            Some(ErrorStage::Transport)
        );

        item.clear_error();
        assert!(!item.is_failed());
    }

    #[test]
    fn test_error_stage_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorStage::Orchestration).unwrap();
        assert_eq!(json, "\"orchestration\"");
    }

    #[test]
    fn test_migration_item_skips_empty_fields() {
        let item = MigrationItem::new("x");
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json, serde_json::json!({"source_id": "x"}));
    }
}
