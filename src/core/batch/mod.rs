//! Multipart batch RPC
//!
//! - [`encoder`] - serializes operations into a `multipart/mixed` body
//! - [`decoder`] - frames the response and correlates parts to operations
//! - [`dispatcher`] - sends one batch with transport retries
//! - [`parser`] - caller-supplied interpretation of each sub-response

pub mod decoder;
pub mod dispatcher;
pub mod encoder;
pub mod parser;

pub use decoder::{decode_batch_response, DecodeStats, DecodedPart, EncapsulatedResponse};
pub use dispatcher::{BatchDispatcher, SingleBatchResult};
pub use encoder::{BatchEncoder, EncodedBatch};
pub use parser::ResponseParser;
