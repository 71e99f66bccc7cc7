//! Shared helpers for integration tests: a scripted in-memory transport and
//! small builders for operations and settings.

#![allow(dead_code)]

use async_trait::async_trait;
use classroom_batch::adapters::http::{BatchRequest, BatchResponse, BatchTransport};
use classroom_batch::config::RetryConfig;
use classroom_batch::core::orchestrator::OrchestratorSettings;
use classroom_batch::domain::{
    CorrelationToken, HttpMethod, MigrationItem, Operation, TransportError,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const RESPONSE_BOUNDARY: &str = "batch_response_xyz";

type Responder =
    Box<dyn Fn(usize, &[String]) -> Result<BatchResponse, TransportError> + Send + Sync>;

/// One call observed by the scripted transport
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub ids: Vec<String>,
    pub bearer_token: String,
    pub content_type: String,
    pub body: String,
}

/// Transport that answers from a closure and records every call
pub struct ScriptedTransport {
    responder: Responder,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    /// Full control: `(call_index, ids_in_request) -> response`
    pub fn raw<F>(f: F) -> Arc<Self>
    where
        F: Fn(usize, &[String]) -> Result<BatchResponse, TransportError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            responder: Box::new(f),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Per-item replies: `(id, attempt for that id starting at 1) -> (status, body)`
    pub fn per_item<F>(f: F) -> Arc<Self>
    where
        F: Fn(&str, u32) -> (u16, Value) + Send + Sync + 'static,
    {
        let attempts: Mutex<HashMap<String, u32>> = Mutex::new(HashMap::new());
        Self::raw(move |_, ids| {
            let mut attempts = attempts.lock().unwrap();
            let parts: Vec<(String, u16, Value)> = ids
                .iter()
                .map(|id| {
                    let n = attempts.entry(id.clone()).or_insert(0);
                    *n += 1;
                    let (status, body) = f(id, *n);
                    (id.clone(), status, body)
                })
                .collect();
            Ok(multipart_response(&parts))
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BatchTransport for ScriptedTransport {
    async fn send(
        &self,
        request: &BatchRequest,
        bearer_token: &str,
    ) -> Result<BatchResponse, TransportError> {
        let ids = content_ids(&request.body);
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(RecordedCall {
                ids: ids.clone(),
                bearer_token: bearer_token.to_string(),
                content_type: request.content_type.clone(),
                body: request.body.clone(),
            });
            calls.len() - 1
        };
        (self.responder)(index, &ids)
    }
}

/// Extracts `Content-ID: <token>` values from an encoded batch body
pub fn content_ids(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|line| line.strip_prefix("Content-ID: "))
        .map(|v| v.trim().trim_start_matches('<').trim_end_matches('>').to_string())
        .collect()
}

pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// One response part in Google's batch format
pub fn response_part(id: &str, status: u16, body: &Value) -> String {
    format!(
        "--{RESPONSE_BOUNDARY}\r\nContent-Type: application/http\r\nContent-ID: <response-{id}>\r\n\r\nHTTP/1.1 {status} {}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{body}\r\n",
        reason_phrase(status)
    )
}

/// A 200 multipart batch response with the given parts, in order
pub fn multipart_response(parts: &[(String, u16, Value)]) -> BatchResponse {
    let mut body = String::new();
    for (id, status, json) in parts {
        body.push_str(&response_part(id, *status, json));
    }
    body.push_str(&format!("--{RESPONSE_BOUNDARY}--\r\n"));
    multipart_body(body)
}

/// A 200 response with an arbitrary multipart body
pub fn multipart_body(body: String) -> BatchResponse {
    BatchResponse {
        status: 200,
        status_text: "OK".to_string(),
        content_type: Some(format!("multipart/mixed; boundary={RESPONSE_BOUNDARY}")),
        body,
    }
}

/// A whole-batch status response with a plain JSON body
pub fn batch_status(status: u16) -> BatchResponse {
    BatchResponse {
        status,
        status_text: reason_phrase(status).to_string(),
        content_type: Some("application/json".to_string()),
        body: json!({"error": {"code": status}}).to_string(),
    }
}

pub fn google_error(status: u16, message: &str) -> Value {
    json!({"error": {"code": status, "message": message}})
}

pub fn op(id: &str) -> Operation<MigrationItem> {
    Operation::new(
        CorrelationToken::new(id).unwrap(),
        HttpMethod::Post,
        "/v1/courses/100/topics",
        json!({"name": id}),
        MigrationItem::new(id),
    )
}

pub fn ops(ids: &[&str]) -> Vec<Operation<MigrationItem>> {
    ids.iter().map(|id| op(id)).collect()
}

/// Fast retry settings: no jitter, millisecond delays
pub fn fast_retry(max_retries: u32) -> RetryConfig {
    RetryConfig {
        max_retries,
        initial_delay_ms: 5,
        backoff_factor: 2.0,
        max_delay_ms: 50,
        max_jitter_ms: 0,
        ..RetryConfig::default()
    }
}

pub fn settings(batch_size: usize, retry: RetryConfig) -> OrchestratorSettings {
    OrchestratorSettings {
        batch_url: "https://classroom.googleapis.com/batch".to_string(),
        max_operations_per_batch: batch_size,
        retry,
        deadline: None,
        max_dispatches: None,
    }
}

pub fn with_deadline(mut settings: OrchestratorSettings, deadline: Duration) -> OrchestratorSettings {
    settings.deadline = Some(deadline);
    settings
}

pub fn with_max_dispatches(mut settings: OrchestratorSettings, max: usize) -> OrchestratorSettings {
    settings.max_dispatches = Some(max);
    settings
}
