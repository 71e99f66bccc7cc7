//! Result type alias for classroom-batch

use super::errors::BatchError;

/// Result type alias using [`BatchError`] as the error type
///
/// # Examples
///
/// ```
/// use classroom_batch::domain::result::Result;
/// use classroom_batch::domain::errors::BatchError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(BatchError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, BatchError>;
