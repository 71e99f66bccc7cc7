//! Batch-RPC engine
//!
//! - [`retry`] - retry classification and exponential backoff
//! - [`batch`] - multipart encoding, decoding and single-batch dispatch
//! - [`limits`] - cancellation signal and run deadline
//! - [`orchestrator`] - the run loop that drives every operation to a
//!   terminal state
//!
//! Flow of one run:
//!
//! 1. Operations enter a FIFO queue
//! 2. The loop takes up to `max_operations_per_batch` and dispatches them
//! 3. The dispatcher encodes, sends (retrying the whole batch on transport
//!    failures), decodes and applies the response parser
//! 4. Items failed with a retryable status are scheduled for a delayed
//!    re-enqueue; everything else is final
//! 5. The run ends when the queue and the retry schedule are both empty

pub mod batch;
pub mod limits;
pub mod orchestrator;
pub mod retry;
