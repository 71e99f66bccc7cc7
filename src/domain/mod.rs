//! Domain models and types for classroom-batch.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Correlation tokens** ([`CorrelationToken`]) linking sub-requests to sub-responses
//! - **Operations** ([`Operation`]) carried inside a multipart batch
//! - **Processed items** ([`ProcessedItem`], [`MigrationItem`]) and their
//!   structured failures ([`ProcessingError`])
//! - **Error types** ([`BatchError`], [`TransportError`])
//! - **Result type alias** ([`Result`])
//!
//! # Example
//!
//! ```rust
//! use classroom_batch::domain::{CorrelationToken, HttpMethod, MigrationItem, Operation};
//! use serde_json::json;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let id = CorrelationToken::new("coursework-42")?;
//! let op = Operation::new(
//!     id.clone(),
//!     HttpMethod::Post,
//!     "/v1/courses/123/courseWork",
//!     json!({"title": "Lab report", "workType": "ASSIGNMENT"}),
//!     MigrationItem::new(id.as_str()),
//! );
//! assert_eq!(op.retries_attempted, 0);
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod ids;
pub mod item;
pub mod operation;
pub mod result;

// Re-export commonly used types for convenience
pub use errors::{BatchError, TransportError};
pub use ids::CorrelationToken;
pub use item::{ErrorDetails, ErrorStage, MigrationItem, ProcessedItem, ProcessingError};
pub use operation::{HttpMethod, Operation, OperationRequest};
pub use result::Result;
