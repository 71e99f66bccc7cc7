//! Parser for Google API sub-responses
//!
//! Success bodies are stored on the item together with the `id` Google
//! assigns. Failures are read from the standard error envelope:
//!
//! ```json
//! {"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}
//! ```

use crate::core::batch::ResponseParser;
use crate::domain::{CorrelationToken, ErrorStage, MigrationItem, ProcessedItem, ProcessingError};
use serde_json::Value;

/// [`ResponseParser`] for [`MigrationItem`]s against Google APIs
#[derive(Debug, Clone, Copy, Default)]
pub struct GoogleApiParser;

impl ResponseParser<MigrationItem> for GoogleApiParser {
    fn parse(
        &self,
        item: &mut MigrationItem,
        body: &Value,
        status_code: u16,
        status_text: &str,
        correlation_id: &CorrelationToken,
    ) {
        if (200..300).contains(&status_code) {
            item.remote_id = body.get("id").and_then(value_as_id);
            item.response = Some(body.clone());
            tracing::debug!(
                correlation_id = %correlation_id,
                remote_id = ?item.remote_id,
                "Operation succeeded"
            );
            return;
        }

        let envelope = body.get("error");
        let message = envelope
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| {
                if status_text.is_empty() {
                    format!("HTTP {status_code}")
                } else {
                    status_text.to_string()
                }
            });

        // The envelope code wins when present; it is what Google documents
        // for retry decisions.
        let code = envelope
            .and_then(|e| e.get("code"))
            .and_then(Value::as_u64)
            .and_then(|c| u16::try_from(c).ok())
            .unwrap_or(status_code);

        item.record_error(
            ProcessingError::new(ErrorStage::Item, message)
                .with_status(code)
                .with_status_text(status_text)
                .with_body(body.clone())
                .with_correlation_id(correlation_id.clone()),
        );
    }
}

fn value_as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
