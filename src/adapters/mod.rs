//! External integrations
//!
//! - [`http`] - the [`BatchTransport`](http::BatchTransport) seam and its
//!   reqwest implementation
//! - [`google`] - Google batch endpoints and the default response parser
//!
//! The engine in [`crate::core`] only sees the transport trait, so tests
//! substitute scripted transports for the network.

pub mod google;
pub mod http;
