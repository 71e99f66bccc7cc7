//! HTTP transport for batch requests
//!
//! The engine talks to the network through [`BatchTransport`] so tests can
//! replay scripted responses without a server.

pub mod transport;

pub use transport::{BatchRequest, BatchResponse, BatchTransport, ReqwestTransport};
