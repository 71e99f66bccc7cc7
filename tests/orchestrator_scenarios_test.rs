//! End-to-end orchestration scenarios against a scripted transport

mod common;

use classroom_batch::adapters::google::GoogleApiParser;
use classroom_batch::adapters::http::BatchResponse;
use classroom_batch::config::secret_string;
use classroom_batch::core::orchestrator::Orchestrator;
use classroom_batch::domain::{
    BatchError, CorrelationToken, ErrorStage, MigrationItem, ProcessedItem, ProcessingError,
    TransportError,
};
use common::*;
use serde_json::{json, Value};
use std::collections::HashSet;

fn token() -> classroom_batch::config::SecretString {
    secret_string("ya29.test-token".to_string())
}

fn item<'a>(items: &'a [MigrationItem], id: &str) -> &'a MigrationItem {
    items
        .iter()
        .find(|i| i.source_id == id)
        .unwrap_or_else(|| panic!("no item {id}"))
}

#[tokio::test]
async fn test_success_rate_limit_and_not_found_in_one_batch() {
    let transport = ScriptedTransport::per_item(|id, attempt| match (id, attempt) {
        ("a", _) => (200, json!({"id": "remote-a"})),
        ("b", 1) => (429, google_error(429, "Quota exceeded")),
        ("b", _) => (200, json!({"id": "remote-b"})),
        _ => (404, google_error(404, "Course not found")),
    });
    let orchestrator = Orchestrator::new(transport.clone(), settings(50, fast_retry(2)));

    let report = orchestrator
        .run(ops(&["a", "b", "c"]), &GoogleApiParser, Some(&token()), None)
        .await
        .unwrap();

    let a = item(&report.items, "a");
    assert!(!a.is_failed());
    assert_eq!(a.remote_id.as_deref(), Some("remote-a"));

    let b = item(&report.items, "b");
    assert!(!b.is_failed());
    assert_eq!(b.remote_id.as_deref(), Some("remote-b"));

    let c = item(&report.items, "c");
    let err = c.processing_error.as_ref().unwrap();
    assert_eq!(err.stage, ErrorStage::Item);
    assert_eq!(err.status_code(), Some(404));
    assert_eq!(err.message, "Course not found");

    let calls = transport.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].ids, vec!["a", "b", "c"]);
    assert_eq!(calls[1].ids, vec!["b"]);
    assert_eq!(calls[0].bearer_token, "ya29.test-token");

    assert_eq!(report.summary.succeeded, 2);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.summary.retries_scheduled, 1);
    assert_eq!(report.summary.batches_dispatched, 2);
}

#[tokio::test]
async fn test_non_multipart_response_fails_batch_without_retry() {
    let transport = ScriptedTransport::raw(|_, _| {
        Ok(BatchResponse {
            status: 200,
            status_text: "OK".to_string(),
            content_type: Some("text/plain".to_string()),
            body: "maintenance".to_string(),
        })
    });
    let orchestrator = Orchestrator::new(transport.clone(), settings(50, fast_retry(3)));

    let report = orchestrator
        .run(ops(&["a", "b"]), &GoogleApiParser, Some(&token()), None)
        .await
        .unwrap();

    assert_eq!(transport.call_count(), 1);
    for item in &report.items {
        let err = item.processing_error.as_ref().unwrap();
        assert_eq!(err.stage, ErrorStage::Format);
    }
    assert_eq!(report.summary.retries_scheduled, 0);
}

#[tokio::test]
async fn test_missing_credential_dispatches_nothing() {
    let transport = ScriptedTransport::per_item(|_, _| (200, json!({})));
    let orchestrator = Orchestrator::new(transport.clone(), settings(50, fast_retry(2)));

    let result = orchestrator
        .run(ops(&["a"]), &GoogleApiParser, None, None)
        .await;
    assert!(matches!(result, Err(BatchError::MissingCredential(_))));

    let blank = secret_string("   ".to_string());
    let result = orchestrator
        .run(ops(&["a"]), &GoogleApiParser, Some(&blank), None)
        .await;
    assert!(matches!(result, Err(BatchError::MissingCredential(_))));

    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn test_rate_limit_becomes_terminal_at_budget() {
    let transport =
        ScriptedTransport::per_item(|_, _| (429, google_error(429, "Rate limit exceeded")));
    let orchestrator = Orchestrator::new(transport.clone(), settings(50, fast_retry(2)));

    let report = orchestrator
        .run(ops(&["a"]), &GoogleApiParser, Some(&token()), None)
        .await
        .unwrap();

    // initial attempt plus two retries
    assert_eq!(transport.call_count(), 3);
    assert_eq!(report.summary.retries_scheduled, 2);
    let err = report.items[0].processing_error.as_ref().unwrap();
    assert_eq!(err.stage, ErrorStage::Item);
    assert_eq!(err.status_code(), Some(429));
}

#[tokio::test]
async fn test_every_operation_reported_exactly_once() {
    let ids: Vec<String> = (0..120).map(|i| format!("op-{i}")).collect();
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();

    let transport = ScriptedTransport::per_item(|id, attempt| {
        let n: u32 = id.trim_start_matches("op-").parse().unwrap();
        match n % 4 {
            0 => (200, json!({"id": id})),
            1 if attempt < 2 => (503, google_error(503, "Backend error")),
            1 => (200, json!({"id": id})),
            2 => (400, google_error(400, "Invalid payload")),
            _ => (429, google_error(429, "Quota exceeded")),
        }
    });
    let orchestrator = Orchestrator::new(transport.clone(), settings(50, fast_retry(2)));

    let report = orchestrator
        .run(ops(&id_refs), &GoogleApiParser, Some(&token()), None)
        .await
        .unwrap();

    assert_eq!(report.items.len(), 120);
    let unique: HashSet<&str> = report.items.iter().map(|i| i.source_id.as_str()).collect();
    assert_eq!(unique.len(), 120);

    // submission order is preserved
    let returned: Vec<&str> = report.items.iter().map(|i| i.source_id.as_str()).collect();
    assert_eq!(returned, id_refs);

    assert_eq!(report.summary.succeeded, 60);
    assert_eq!(report.summary.failed, 60);

    for call in transport.calls() {
        assert!(call.ids.len() <= 50);
    }
}

#[tokio::test]
async fn test_unmatched_content_id_is_ignored() {
    let transport = ScriptedTransport::raw(|_, ids| {
        let mut parts = vec![("ghost".to_string(), 200, json!({"id": "nope"}))];
        parts.extend(ids.iter().map(|id| (id.clone(), 200, json!({"id": id}))));
        Ok(multipart_response(&parts))
    });
    let orchestrator = Orchestrator::new(transport, settings(50, fast_retry(1)));

    let report = orchestrator
        .run(ops(&["a", "b"]), &GoogleApiParser, Some(&token()), None)
        .await
        .unwrap();

    assert!(report.summary.is_successful());
    assert_eq!(item(&report.items, "a").remote_id.as_deref(), Some("a"));
    assert_eq!(item(&report.items, "b").remote_id.as_deref(), Some("b"));
}

#[tokio::test]
async fn test_response_parts_in_any_order_match_their_operations() {
    let transport = ScriptedTransport::raw(|_, ids| {
        let parts: Vec<(String, u16, Value)> = ids
            .iter()
            .rev()
            .map(|id| (id.clone(), 201, json!({"id": format!("remote-{id}")})))
            .collect();
        Ok(multipart_response(&parts))
    });
    let orchestrator = Orchestrator::new(transport, settings(50, fast_retry(0)));

    let report = orchestrator
        .run(ops(&["x", "y", "z"]), &GoogleApiParser, Some(&token()), None)
        .await
        .unwrap();

    for id in ["x", "y", "z"] {
        let expected = format!("remote-{id}");
        assert_eq!(item(&report.items, id).remote_id.as_deref(), Some(expected.as_str()));
    }
}

#[tokio::test]
async fn test_missing_response_part_is_format_error() {
    let transport = ScriptedTransport::raw(|_, ids| {
        let first = ids[0].clone();
        Ok(multipart_response(&[(first, 200, json!({"id": "1"}))]))
    });
    let orchestrator = Orchestrator::new(transport, settings(50, fast_retry(2)));

    let report = orchestrator
        .run(ops(&["a", "b"]), &GoogleApiParser, Some(&token()), None)
        .await
        .unwrap();

    assert!(!item(&report.items, "a").is_failed());
    let err = item(&report.items, "b").processing_error.as_ref().unwrap();
    assert_eq!(err.stage, ErrorStage::Format);
    assert_eq!(err.message, "No response part for operation");
}

#[tokio::test]
async fn test_transport_retry_recovers_whole_batch() {
    let transport = ScriptedTransport::raw(|call, ids| {
        if call == 0 {
            Ok(batch_status(503))
        } else {
            let parts: Vec<_> = ids.iter().map(|id| (id.clone(), 200, json!({"id": id}))).collect();
            Ok(multipart_response(&parts))
        }
    });
    let orchestrator = Orchestrator::new(transport.clone(), settings(50, fast_retry(2)));

    let report = orchestrator
        .run(ops(&["a", "b"]), &GoogleApiParser, Some(&token()), None)
        .await
        .unwrap();

    assert!(report.summary.is_successful());
    assert_eq!(transport.call_count(), 2);
    assert_eq!(report.summary.batches_dispatched, 1);
    assert_eq!(report.summary.transport_attempts, 2);
    assert_eq!(report.summary.retries_scheduled, 0);
}

#[tokio::test]
async fn test_unauthorized_batch_is_terminal() {
    let transport = ScriptedTransport::raw(|_, _| Ok(batch_status(401)));
    let orchestrator = Orchestrator::new(transport.clone(), settings(50, fast_retry(3)));

    let report = orchestrator
        .run(ops(&["a", "b"]), &GoogleApiParser, Some(&token()), None)
        .await
        .unwrap();

    assert_eq!(transport.call_count(), 1);
    for item in &report.items {
        let err = item.processing_error.as_ref().unwrap();
        assert_eq!(err.stage, ErrorStage::Transport);
        assert_eq!(err.status_code(), Some(401));
    }
}

#[tokio::test]
async fn test_exhausted_transport_retries_fail_every_operation() {
    let transport = ScriptedTransport::raw(|_, _| {
        Err(TransportError::ConnectionFailed("connection refused".to_string()))
    });
    let orchestrator = Orchestrator::new(transport.clone(), settings(50, fast_retry(2)));

    let report = orchestrator
        .run(ops(&["a", "b", "c"]), &GoogleApiParser, Some(&token()), None)
        .await
        .unwrap();

    assert_eq!(transport.call_count(), 3);
    assert_eq!(report.items.len(), 3);
    for item in &report.items {
        let err = item.processing_error.as_ref().unwrap();
        assert_eq!(err.stage, ErrorStage::Transport);
        assert!(err.message.contains("after 3 attempt(s)"));
        assert!(err.details.correlation_id.is_some());
    }
    assert_eq!(report.summary.failures_by_stage.get(&ErrorStage::Transport), Some(&3));
}

#[tokio::test]
async fn test_batches_respect_size_limit_and_fifo_order() {
    let transport = ScriptedTransport::per_item(|id, _| (200, json!({"id": id})));
    let orchestrator = Orchestrator::new(transport.clone(), settings(2, fast_retry(0)));

    orchestrator
        .run(ops(&["a", "b", "c", "d", "e"]), &GoogleApiParser, Some(&token()), None)
        .await
        .unwrap();

    let batches: Vec<Vec<String>> = transport.calls().into_iter().map(|c| c.ids).collect();
    assert_eq!(batches, vec![vec!["a", "b"], vec!["c", "d"], vec!["e"]]);
}

#[tokio::test]
async fn test_requests_carry_multipart_content_type() {
    let transport = ScriptedTransport::per_item(|_, _| (200, json!({})));
    let orchestrator = Orchestrator::new(transport.clone(), settings(50, fast_retry(0)));

    orchestrator
        .run(ops(&["a"]), &GoogleApiParser, Some(&token()), None)
        .await
        .unwrap();

    let call = &transport.calls()[0];
    assert!(call.content_type.starts_with("multipart/mixed; boundary=batch_"));
    assert!(call.body.contains("POST /v1/courses/100/topics HTTP/1.1\r\n"));
}

#[tokio::test]
async fn test_duplicate_tokens_rejected_before_dispatch() {
    let transport = ScriptedTransport::per_item(|_, _| (200, json!({})));
    let orchestrator = Orchestrator::new(transport.clone(), settings(50, fast_retry(0)));

    let result = orchestrator
        .run(ops(&["a", "a"]), &GoogleApiParser, Some(&token()), None)
        .await;

    assert!(matches!(result, Err(BatchError::Validation(_))));
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn test_empty_run_completes_without_dispatch() {
    let transport = ScriptedTransport::per_item(|_, _| (200, json!({})));
    let orchestrator = Orchestrator::new(transport.clone(), settings(50, fast_retry(0)));

    let report = orchestrator
        .run(Vec::new(), &GoogleApiParser, Some(&token()), None)
        .await
        .unwrap();

    assert!(report.items.is_empty());
    assert_eq!(transport.call_count(), 0);
}

/// Caller-defined item driven by a closure parser
#[derive(Debug, Default)]
struct CourseWorkItem {
    title: String,
    created: bool,
    error: Option<ProcessingError>,
}

impl ProcessedItem for CourseWorkItem {
    fn processing_error(&self) -> Option<&ProcessingError> {
        self.error.as_ref()
    }

    fn record_error(&mut self, error: ProcessingError) {
        self.error = Some(error);
    }

    fn clear_error(&mut self) {
        self.error = None;
    }
}

#[tokio::test]
async fn test_closure_parser_with_custom_item() {
    use classroom_batch::domain::{HttpMethod, Operation};

    let transport = ScriptedTransport::per_item(|id, _| match id {
        "cw-1" => (200, json!({"id": "1"})),
        _ => (500, json!({})),
    });
    let orchestrator = Orchestrator::new(transport, settings(50, fast_retry(0)));

    let operations: Vec<Operation<CourseWorkItem>> = ["cw-1", "cw-2"]
        .iter()
        .map(|id| {
            Operation::new(
                CorrelationToken::new(*id).unwrap(),
                HttpMethod::Post,
                "/v1/courses/1/courseWork",
                json!({"title": id}),
                CourseWorkItem {
                    title: id.to_string(),
                    ..Default::default()
                },
            )
        })
        .collect();

    // Silent on failure: the engine must still record one.
    let parser = |item: &mut CourseWorkItem, _: &Value, status: u16, _: &str, _: &CorrelationToken| {
        if (200..300).contains(&status) {
            item.created = true;
        }
    };

    let report = orchestrator
        .run(operations, &parser, Some(&token()), None)
        .await
        .unwrap();

    assert_eq!(report.items[0].title, "cw-1");
    assert!(report.items[0].created);
    let err = report.items[1].error.as_ref().unwrap();
    assert_eq!(err.message, "Batch item failed");
    assert_eq!(err.status_code(), Some(500));
}
