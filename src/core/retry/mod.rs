//! Retry policy
//!
//! Maps a failure and the number of attempts already made to a retry-or-stop
//! decision with an exponential backoff delay.

pub mod policy;

pub use policy::{Failure, FailureClass, RetryDecision, RetryPolicy};
