//! Response parser seam
//!
//! The caller supplies a parser that turns one sub-response into updates on
//! its processed item. The engine treats it as opaque: whatever the parser
//! writes into the item's error slot decides retry eligibility.

use crate::domain::CorrelationToken;
use serde_json::Value;

/// Applies one sub-response to its processed item
pub trait ResponseParser<I>: Send + Sync {
    /// Called once per matched response part
    ///
    /// `body` is the parsed JSON (`{}` when the part had no valid JSON).
    /// An error recorded with a status code in the retryable set makes the
    /// operation eligible for an item-level retry, whatever its stage.
    fn parse(
        &self,
        item: &mut I,
        body: &Value,
        status_code: u16,
        status_text: &str,
        correlation_id: &CorrelationToken,
    );
}

impl<I, F> ResponseParser<I> for F
where
    F: Fn(&mut I, &Value, u16, &str, &CorrelationToken) + Send + Sync,
{
    fn parse(
        &self,
        item: &mut I,
        body: &Value,
        status_code: u16,
        status_text: &str,
        correlation_id: &CorrelationToken,
    ) {
        self(item, body, status_code, status_text, correlation_id)
    }
}
