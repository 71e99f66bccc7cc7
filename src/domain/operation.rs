//! Batchable operations
//!
//! An [`Operation`] is one logical API call that travels inside a multipart
//! batch. It owns the item that records its outcome.

use super::ids::CorrelationToken;
use super::item::MigrationItem;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// HTTP method of an encapsulated sub-request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// Method name as it appears on the request line
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            other => Err(format!("Unsupported HTTP method: {other}")),
        }
    }
}

/// Checks that a sub-request path can sit on a request line
///
/// The path is written verbatim between the method and `HTTP/1.1`, so it must
/// be non-empty and free of ASCII whitespace and control characters.
pub fn validate_path(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("Operation path cannot be empty".to_string());
    }
    if let Some(c) = path
        .chars()
        .find(|c| c.is_ascii_whitespace() || c.is_control())
    {
        return Err(format!(
            "Operation path {path:?} contains forbidden character {c:?}"
        ));
    }
    Ok(())
}

/// One create/update call carried inside a batch
#[derive(Debug, Clone)]
pub struct Operation<I> {
    /// Correlation token, stable across retries
    pub id: CorrelationToken,

    /// Sub-request method
    pub method: HttpMethod,

    /// Sub-request path, e.g. `/v1/courses/123/courseWork`
    pub path: String,

    /// JSON payload (`Value::Null` for no body)
    pub body: Value,

    /// Outcome record
    pub item: I,

    /// Item-level retries already scheduled for this operation
    pub retries_attempted: u32,
}

impl<I> Operation<I> {
    /// Creates an operation that has not been retried yet
    pub fn new(
        id: CorrelationToken,
        method: HttpMethod,
        path: impl Into<String>,
        body: Value,
        item: I,
    ) -> Self {
        Self {
            id,
            method,
            path: path.into(),
            body,
            item,
            retries_attempted: 0,
        }
    }

    /// Whether the sub-request carries a JSON body
    pub fn has_body(&self) -> bool {
        !self.body.is_null()
    }
}

/// Serialized form of an operation in a CLI manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRequest {
    /// Optional caller-chosen token; generated when absent
    #[serde(default)]
    pub id: Option<String>,

    /// Sub-request method
    pub method: HttpMethod,

    /// Sub-request path
    pub path: String,

    /// JSON payload
    #[serde(default)]
    pub body: Value,
}

impl OperationRequest {
    /// Turns a manifest entry into an operation owning a fresh [`MigrationItem`]
    pub fn into_operation(self) -> Result<Operation<MigrationItem>, String> {
        validate_path(&self.path)?;
        let id = match self.id {
            Some(id) => CorrelationToken::new(id)?,
            None => CorrelationToken::generate(),
        };
        let item = MigrationItem::new(id.as_str());
        Ok(Operation::new(id, self.method, self.path, self.body, item))
    }
}
