//! Multipart batch decoder
//!
//! Turns a `multipart/mixed` batch response into per-operation outcomes.
//! Framing is done by a line tokenizer with explicit states rather than by
//! splitting the whole body on the boundary, so bodies are scanned once and
//! a truncated final part is still recovered.
//!
//! Malformed or unmatched parts never abort decoding: they are logged and,
//! where an operation can be identified, recorded on its item.

use super::parser::ResponseParser;
use crate::domain::{CorrelationToken, ErrorStage, Operation, ProcessedItem, ProcessingError};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

const RESPONSE_PREFIX: &str = "response-";

/// One raw MIME part of the batch response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPart {
    /// Part headers in arrival order (names as received)
    pub headers: Vec<(String, String)>,

    /// Part body with line breaks normalized to CRLF
    pub body: String,
}

impl RawPart {
    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Encapsulated HTTP response carried by one part
#[derive(Debug, Clone, PartialEq)]
pub struct EncapsulatedResponse {
    pub status_code: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    /// Parsed JSON body (`{}` when empty or unparseable)
    pub body: Value,
    /// JSON parse failure, if the body was not valid JSON
    pub body_error: Option<String>,
}

impl EncapsulatedResponse {
    /// Whether the status code is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// A decoded part: correlation token plus the parsed response or its failure
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPart {
    pub correlation_id: Option<CorrelationToken>,
    pub response: Result<EncapsulatedResponse, ProcessingError>,
}

/// Counters from applying decoded parts to a batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeStats {
    pub matched: usize,
    pub unmatched: usize,
    pub duplicates: usize,
    pub missing: usize,
    pub malformed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenizerState {
    SeekingBoundary,
    PartHeaders,
    PartBody,
    Done,
}

/// Line tokenizer over a multipart body
///
/// Accepts CRLF or bare LF line endings and trailing whitespace after
/// boundary delimiters.
struct MultipartTokenizer {
    delimiter: String,
    close_delimiter: String,
    state: TokenizerState,
    current: Option<RawPart>,
    body_lines: Vec<String>,
    parts: Vec<RawPart>,
}

impl MultipartTokenizer {
    fn new(boundary: &str) -> Self {
        Self {
            delimiter: format!("--{boundary}"),
            close_delimiter: format!("--{boundary}--"),
            state: TokenizerState::SeekingBoundary,
            current: None,
            body_lines: Vec::new(),
            parts: Vec::new(),
        }
    }

    fn feed(&mut self, line: &str) {
        if self.state == TokenizerState::Done {
            return;
        }

        let candidate = line.trim_end();
        if candidate == self.close_delimiter {
            self.finish_part();
            self.state = TokenizerState::Done;
            return;
        }
        if candidate == self.delimiter {
            self.finish_part();
            self.current = Some(RawPart::default());
            self.state = TokenizerState::PartHeaders;
            return;
        }

        match self.state {
            TokenizerState::SeekingBoundary | TokenizerState::Done => {}
            TokenizerState::PartHeaders => {
                if line.is_empty() {
                    self.state = TokenizerState::PartBody;
                } else if let Some((name, value)) = line.split_once(':') {
                    if let Some(part) = self.current.as_mut() {
                        part.headers
                            .push((name.trim().to_string(), value.trim().to_string()));
                    }
                } else {
                    tracing::debug!(line = %line, "Ignoring malformed multipart header line");
                }
            }
            TokenizerState::PartBody => self.body_lines.push(line.to_string()),
        }
    }

    fn finish_part(&mut self) {
        if let Some(mut part) = self.current.take() {
            let mut lines = std::mem::take(&mut self.body_lines);
            while lines.last().map(|l| l.trim().is_empty()).unwrap_or(false) {
                lines.pop();
            }
            part.body = lines.join("\r\n");
            if !part.headers.is_empty() || !part.body.is_empty() {
                self.parts.push(part);
            }
        }
    }

    fn finish(mut self) -> Vec<RawPart> {
        if self.state != TokenizerState::Done && self.current.is_some() {
            tracing::warn!("Multipart body ended without a closing delimiter");
            self.finish_part();
        }
        self.parts
    }
}

/// Extracts the boundary from a `multipart/mixed` content type
///
/// # Errors
///
/// Returns a format error if the media type is not `multipart/mixed` or the
/// `boundary` parameter is missing.
pub fn extract_boundary(content_type: Option<&str>) -> Result<String, ProcessingError> {
    let content_type = content_type.ok_or_else(|| {
        ProcessingError::new(ErrorStage::Format, "Batch response has no Content-Type header")
    })?;

    let mut params = content_type.split(';');
    let media_type = params.next().unwrap_or_default().trim();
    if !media_type.eq_ignore_ascii_case("multipart/mixed") {
        return Err(ProcessingError::new(
            ErrorStage::Format,
            format!("Unexpected batch response content type '{media_type}'"),
        ));
    }

    params
        .filter_map(|p| p.split_once('='))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("boundary"))
        .map(|(_, v)| v.trim().trim_matches('"').to_string())
        .filter(|b| !b.is_empty())
        .ok_or_else(|| {
            ProcessingError::new(
                ErrorStage::Format,
                "Batch response Content-Type has no boundary parameter",
            )
        })
}

/// Splits a multipart body into raw parts
pub fn split_parts(body: &str, boundary: &str) -> Vec<RawPart> {
    let mut tokenizer = MultipartTokenizer::new(boundary);
    for line in body.lines() {
        tokenizer.feed(line);
    }
    tokenizer.finish()
}

/// Normalizes a response `Content-ID` to the correlation token
///
/// Accepts `<response-TOKEN>`, `response-TOKEN` and, leniently, a bare token.
pub fn correlation_from_content_id(content_id: &str) -> Option<CorrelationToken> {
    let trimmed = content_id
        .trim()
        .trim_start_matches('<')
        .trim_end_matches('>')
        .trim();
    let token = trimmed.strip_prefix(RESPONSE_PREFIX).unwrap_or(trimmed);
    CorrelationToken::new(token).ok()
}

/// Parses the encapsulated HTTP response inside one part
pub fn parse_encapsulated(part_body: &str) -> Result<EncapsulatedResponse, ProcessingError> {
    let (head, body) = split_head_and_body(part_body);

    let mut head_lines = head.lines().map(str::trim).filter(|l| !l.is_empty());
    let status_line = head_lines
        .next()
        .filter(|l| l.starts_with("HTTP/"))
        .ok_or_else(|| {
            ProcessingError::new(
                ErrorStage::Format,
                "Malformed response part: missing HTTP status line",
            )
        })?;
    let (status_code, status_text) = parse_status_line(status_line)?;

    let headers = head_lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let body = body.trim();
    let (json, body_error) = if body.is_empty() {
        (Value::Object(Map::new()), None)
    } else {
        match serde_json::from_str::<Value>(body) {
            Ok(value) => (value, None),
            Err(e) => {
                tracing::error!(
                    status_code = status_code,
                    error = %e,
                    "Response part body is not valid JSON, using empty object"
                );
                (Value::Object(Map::new()), Some(e.to_string()))
            }
        }
    };

    Ok(EncapsulatedResponse {
        status_code,
        status_text,
        headers,
        body: json,
        body_error,
    })
}

fn split_head_and_body(text: &str) -> (&str, &str) {
    // Skip blank lines before the status line so a stray separator is not
    // mistaken for the end of the head.
    let text = text.trim_start_matches(['\r', '\n']);
    for sep in ["\r\n\r\n", "\n\n"] {
        if let Some(idx) = text.find(sep) {
            return (&text[..idx], &text[idx + sep.len()..]);
        }
    }
    (text, "")
}

fn parse_status_line(line: &str) -> Result<(u16, String), ProcessingError> {
    let mut pieces = line.splitn(3, ' ');
    let _version = pieces.next();
    let code = pieces
        .next()
        .and_then(|c| c.trim().parse::<u16>().ok())
        .filter(|c| (100..=599).contains(c))
        .ok_or_else(|| {
            ProcessingError::new(
                ErrorStage::Format,
                format!("Malformed response part: invalid status line '{line}'"),
            )
        })?;
    let text = pieces.next().unwrap_or_default().trim().to_string();
    Ok((code, text))
}

/// Decodes a whole batch response into parts
///
/// # Errors
///
/// Returns a format error that applies to every operation of the batch when
/// the response is not `multipart/mixed` or carries no boundary.
pub fn decode_batch_response(
    content_type: Option<&str>,
    body: &str,
) -> Result<Vec<DecodedPart>, ProcessingError> {
    let boundary = extract_boundary(content_type)?;

    let parts = split_parts(body, &boundary)
        .into_iter()
        .map(|raw| {
            let correlation_id = raw.header("Content-ID").and_then(correlation_from_content_id);
            DecodedPart {
                correlation_id,
                response: parse_encapsulated(&raw.body),
            }
        })
        .collect::<Vec<_>>();

    tracing::debug!(parts = parts.len(), "Decoded multipart batch response");
    Ok(parts)
}

/// Applies decoded parts to the operations of this batch attempt
///
/// Each part is matched to the operation with the identical token; the parser
/// runs for matched parts with a status line. Afterwards:
/// - a non-2xx part whose parser recorded nothing gets a generic item error
/// - an unparseable JSON body whose parser recorded nothing gets a format error
/// - operations that received no part get a format error
pub fn apply_parts<I, P>(
    parts: Vec<DecodedPart>,
    operations: &mut [Operation<I>],
    parser: &P,
) -> DecodeStats
where
    I: ProcessedItem,
    P: ResponseParser<I> + ?Sized,
{
    let index: HashMap<String, usize> = operations
        .iter()
        .enumerate()
        .map(|(i, op)| (op.id.as_str().to_string(), i))
        .collect();
    let mut seen: HashSet<usize> = HashSet::new();
    let mut stats = DecodeStats::default();

    for part in parts {
        let Some(token) = part.correlation_id else {
            tracing::warn!("Skipping response part without a usable Content-ID");
            stats.unmatched += 1;
            continue;
        };

        let Some(&idx) = index.get(token.as_str()) else {
            tracing::warn!(
                correlation_id = %token,
                "Skipping response part that matches no operation in this batch"
            );
            stats.unmatched += 1;
            continue;
        };

        if !seen.insert(idx) {
            tracing::warn!(correlation_id = %token, "Ignoring duplicate response part");
            stats.duplicates += 1;
            continue;
        }
        stats.matched += 1;

        let op = &mut operations[idx];
        let response = match part.response {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(correlation_id = %token, error = %error, "Malformed response part");
                stats.malformed += 1;
                op.item.record_error(error.with_correlation_id(token));
                continue;
            }
        };

        parser.parse(
            &mut op.item,
            &response.body,
            response.status_code,
            &response.status_text,
            &op.id,
        );

        if op.item.is_failed() {
            continue;
        }

        if let Some(json_error) = &response.body_error {
            op.item.record_error(
                ProcessingError::new(
                    ErrorStage::Format,
                    format!("Response body is not valid JSON: {json_error}"),
                )
                .with_status(response.status_code)
                .with_status_text(response.status_text.clone())
                .with_correlation_id(token),
            );
        } else if !response.is_success() {
            op.item.record_error(
                ProcessingError::new(ErrorStage::Item, "Batch item failed")
                    .with_status(response.status_code)
                    .with_status_text(response.status_text)
                    .with_body(response.body)
                    .with_correlation_id(token),
            );
        }
    }

    for (idx, op) in operations.iter_mut().enumerate() {
        if !seen.contains(&idx) {
            tracing::warn!(correlation_id = %op.id, "No response part for operation");
            stats.missing += 1;
            op.item.record_error(
                ProcessingError::new(ErrorStage::Format, "No response part for operation")
                    .with_correlation_id(op.id.clone()),
            );
        }
    }

    stats
}
