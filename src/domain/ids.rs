//! Correlation identifiers
//!
//! A [`CorrelationToken`] links one sub-request of a multipart batch to the
//! sub-response that answers it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque token stitching a batch sub-response back to its operation
///
/// The encoder writes the token verbatim into the sub-request's `Content-ID`
/// and the decoder extracts the same token from the `response-` prefixed
/// `Content-ID` of the answer.
///
/// # Examples
///
/// ```
/// use classroom_batch::domain::ids::CorrelationToken;
/// use std::str::FromStr;
///
/// let token = CorrelationToken::from_str("coursework-17").unwrap();
/// assert_eq!(token.as_str(), "coursework-17");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationToken(String);

impl CorrelationToken {
    /// Creates a token from a caller-supplied string
    ///
    /// Tokens end up inside a MIME header, so they may not be empty and may
    /// not contain whitespace or angle brackets.
    pub fn new(token: impl Into<String>) -> Result<Self, String> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err("Correlation token cannot be empty".to_string());
        }
        if token
            .chars()
            .any(|c| c.is_whitespace() || c == '<' || c == '>')
        {
            return Err(format!(
                "Correlation token '{token}' contains whitespace or angle brackets"
            ));
        }
        Ok(Self(token))
    }

    /// Generates a fresh random token
    pub fn generate() -> Self {
        Self(format!("op-{}", uuid::Uuid::new_v4().simple()))
    }

    /// Returns the token as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CorrelationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CorrelationToken {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for CorrelationToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_valid() {
        let token = CorrelationToken::new("item-1").unwrap();
        assert_eq!(token.as_str(), "item-1");
        assert_eq!(token.to_string(), "item-1");
    }

    #[test]
    fn test_token_rejects_empty() {
        assert!(CorrelationToken::new("").is_err());
        assert!(CorrelationToken::new("   ").is_err());
    }

    #[test]
    fn test_token_rejects_header_breaking_chars() {
        assert!(CorrelationToken::new("a b").is_err());
        assert!(CorrelationToken::new("<a>").is_err());
        assert!(CorrelationToken::new("a\r\nX-Injected: 1").is_err());
    }

    #[test]
    fn test_generated_tokens_are_unique() {
        let a = CorrelationToken::generate();
        let b = CorrelationToken::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("op-"));
        assert!(CorrelationToken::new(a.as_str()).is_ok());
    }

    #[test]
    fn test_token_serde_is_transparent_string() {
        let token = CorrelationToken::new("abc").unwrap();
        let json = serde_json::to_string(&token).unwrap();
        assert_eq!(json, "\"abc\"");
    }
}
