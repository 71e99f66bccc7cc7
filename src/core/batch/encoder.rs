//! Multipart batch encoder
//!
//! Serializes operations into one `multipart/mixed` body. Each part wraps a
//! pseudo-HTTP request and carries the operation's correlation token in its
//! `Content-ID`.

use crate::domain::operation::validate_path;
use crate::domain::{BatchError, Operation, Result};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::fmt::Write;

const CRLF: &str = "\r\n";
const BOUNDARY_PREFIX: &str = "batch_";
const BOUNDARY_RANDOM_LEN: usize = 24;

/// An encoded batch ready to be posted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBatch {
    /// Boundary used between parts
    pub boundary: String,

    /// Full request body
    pub body: String,

    /// Number of operations encoded
    pub operation_count: usize,
}

impl EncodedBatch {
    /// Value for the request's `Content-Type` header
    pub fn content_type(&self) -> String {
        format!("multipart/mixed; boundary={}", self.boundary)
    }
}

/// Generates a random boundary token
pub fn generate_boundary() -> String {
    let random: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(BOUNDARY_RANDOM_LEN)
        .map(char::from)
        .collect();
    format!("{BOUNDARY_PREFIX}{random}")
}

/// Encoder with a per-API batch size cap
#[derive(Debug, Clone)]
pub struct BatchEncoder {
    max_operations: usize,
}

impl BatchEncoder {
    /// Create an encoder that accepts at most `max_operations` per batch
    pub fn new(max_operations: usize) -> Self {
        Self { max_operations }
    }

    /// Maximum operations per batch
    pub fn max_operations(&self) -> usize {
        self.max_operations
    }

    /// Encodes with a fresh random boundary
    pub fn encode<I>(&self, operations: &[Operation<I>]) -> Result<EncodedBatch> {
        self.encode_with_boundary(operations, &generate_boundary())
    }

    /// Encodes with the given boundary
    ///
    /// Output is deterministic for a fixed boundary and operation list.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty batch, a batch above the cap,
    /// a path that is not a single request-line token, or a boundary that is
    /// empty or appears inside a payload.
    pub fn encode_with_boundary<I>(
        &self,
        operations: &[Operation<I>],
        boundary: &str,
    ) -> Result<EncodedBatch> {
        if operations.is_empty() {
            return Err(BatchError::Validation(
                "Cannot encode an empty batch".to_string(),
            ));
        }
        if operations.len() > self.max_operations {
            return Err(BatchError::Validation(format!(
                "Batch of {} operations exceeds the limit of {}",
                operations.len(),
                self.max_operations
            )));
        }
        if boundary.trim().is_empty() {
            return Err(BatchError::Validation("Boundary cannot be empty".to_string()));
        }

        let mut body = String::new();
        for op in operations {
            validate_path(&op.path).map_err(|e| {
                BatchError::Validation(format!("Operation {}: {e}", op.id))
            })?;

            let payload = if op.has_body() {
                Some(op.body.to_string())
            } else {
                None
            };

            if payload
                .as_deref()
                .map(|p| p.contains(boundary))
                .unwrap_or(false)
            {
                return Err(BatchError::Validation(format!(
                    "Payload of operation {} contains the batch boundary",
                    op.id
                )));
            }

            write_part(&mut body, boundary, op, payload.as_deref());
        }
        let _ = write!(body, "--{boundary}--{CRLF}");

        tracing::trace!(
            operations = operations.len(),
            bytes = body.len(),
            "Encoded multipart batch"
        );

        Ok(EncodedBatch {
            boundary: boundary.to_string(),
            body,
            operation_count: operations.len(),
        })
    }
}

fn write_part<I>(body: &mut String, boundary: &str, op: &Operation<I>, payload: Option<&str>) {
    // Writing into a String cannot fail.
    let _ = write!(body, "--{boundary}{CRLF}");
    let _ = write!(body, "Content-Type: application/http{CRLF}");
    let _ = write!(body, "Content-ID: <{}>{CRLF}", op.id);
    body.push_str(CRLF);

    let _ = write!(body, "{} {} HTTP/1.1{CRLF}", op.method, op.path);
    match payload {
        Some(json) => {
            let _ = write!(body, "Content-Type: application/json; charset=UTF-8{CRLF}");
            let _ = write!(body, "Content-Length: {}{CRLF}", json.len());
            body.push_str(CRLF);
            body.push_str(json);
            body.push_str(CRLF);
        }
        None => body.push_str(CRLF),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CorrelationToken, HttpMethod, MigrationItem};
    use serde_json::json;

    fn op(id: &str, method: HttpMethod, path: &str, body: serde_json::Value) -> Operation<MigrationItem> {
        Operation::new(
            CorrelationToken::new(id).unwrap(),
            method,
            path,
            body,
            MigrationItem::new(id),
        )
    }

    #[test]
    fn test_encode_single_operation_exact_bytes() {
        let encoder = BatchEncoder::new(50);
        let ops = vec![op(
            "a1",
            HttpMethod::Post,
            "/v1/courses/7/topics",
            json!({"name": "Week 1"}),
        )];

        let encoded = encoder.encode_with_boundary(&ops, "b0und").unwrap();
        let expected = concat!(
            "--b0und\r\n",
            "Content-Type: application/http\r\n",
            "Content-ID: <a1>\r\n",
            "\r\n",
            "POST /v1/courses/7/topics HTTP/1.1\r\n",
            "Content-Type: application/json; charset=UTF-8\r\n",
            "Content-Length: 17\r\n",
            "\r\n",
            "{\"name\":\"Week 1\"}\r\n",
            "--b0und--\r\n",
        );
        assert_eq!(encoded.body, expected);
        assert_eq!(encoded.content_type(), "multipart/mixed; boundary=b0und");
        assert_eq!(encoded.operation_count, 1);
    }

    #[test]
    fn test_content_length_counts_utf8_bytes() {
        let encoder = BatchEncoder::new(50);
        let ops = vec![op("u", HttpMethod::Post, "/p", json!({"t": "é"}))];
        let encoded = encoder.encode_with_boundary(&ops, "x").unwrap();
        // {"t":"é"} is 9 characters but 10 bytes
        assert!(encoded.body.contains("Content-Length: 10\r\n"));
    }

    #[test]
    fn test_null_body_omits_entity_headers() {
        let encoder = BatchEncoder::new(50);
        let ops = vec![op("d", HttpMethod::Delete, "/v1/courses/7/topics/1", serde_json::Value::Null)];
        let encoded = encoder.encode_with_boundary(&ops, "x").unwrap();
        assert!(encoded.body.contains("DELETE /v1/courses/7/topics/1 HTTP/1.1\r\n\r\n--x--"));
        assert!(!encoded.body.contains("Content-Length"));
    }

    #[test]
    fn test_encoding_is_deterministic_for_fixed_boundary() {
        let encoder = BatchEncoder::new(50);
        let ops = vec![
            op("a", HttpMethod::Post, "/p", json!({"k": 1})),
            op("b", HttpMethod::Patch, "/q", json!({"k": 2})),
        ];
        let first = encoder.encode_with_boundary(&ops, "fixed").unwrap();
        let second = encoder.encode_with_boundary(&ops, "fixed").unwrap();
        assert_eq!(first, second);

        let a = first.body.find("Content-ID: <a>").unwrap();
        let b = first.body.find("Content-ID: <b>").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_rejects_empty_and_oversized_batches() {
        let encoder = BatchEncoder::new(1);
        let empty: Vec<Operation<MigrationItem>> = Vec::new();
        assert!(encoder.encode(&empty).is_err());

        let ops = vec![
            op("a", HttpMethod::Post, "/p", json!({})),
            op("b", HttpMethod::Post, "/p", json!({})),
        ];
        assert!(matches!(encoder.encode(&ops), Err(BatchError::Validation(_))));
    }

    #[test]
    fn test_rejects_boundary_inside_payload() {
        let encoder = BatchEncoder::new(5);
        let ops = vec![op("a", HttpMethod::Post, "/p", json!({"text": "--clash"}))];
        assert!(encoder.encode_with_boundary(&ops, "clash").is_err());
    }

    #[test]
    fn test_rejects_path_that_would_inject_a_part() {
        let encoder = BatchEncoder::new(5);
        let smuggled = "/v1/x HTTP/1.1\r\n\r\n{}\r\n--bnd\r\nContent-Type: application/http\r\nContent-ID: <evil>\r\n\r\nDELETE /v1/courses/1";
        let ops = vec![op("a", HttpMethod::Post, smuggled, json!({}))];

        let err = encoder.encode_with_boundary(&ops, "bnd").unwrap_err();
        assert!(matches!(err, BatchError::Validation(_)));
        assert!(err.to_string().contains("Operation a"));
    }

    #[test]
    fn test_rejects_path_with_space() {
        let encoder = BatchEncoder::new(5);
        let ops = vec![
            op("ok", HttpMethod::Get, "/v1/courses/1", serde_json::Value::Null),
            op("bad", HttpMethod::Get, "/v1/courses/1 HTTP/1.0", serde_json::Value::Null),
        ];
        assert!(matches!(
            encoder.encode_with_boundary(&ops, "x"),
            Err(BatchError::Validation(_))
        ));
    }

    #[test]
    fn test_generated_boundaries_differ() {
        let a = generate_boundary();
        let b = generate_boundary();
        assert_ne!(a, b);
        assert!(a.starts_with("batch_"));
        assert_eq!(a.len(), "batch_".len() + 24);
    }
}
