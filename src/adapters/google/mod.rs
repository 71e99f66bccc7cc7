//! Google Workspace batch APIs
//!
//! Endpoint catalogue for Classroom, Drive and Forms, and a response parser
//! that understands Google's JSON error envelope.

pub mod endpoints;
pub mod parser;

pub use endpoints::GoogleApi;
pub use parser::GoogleApiParser;
