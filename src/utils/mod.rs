//! Utility functions and helper modules.
//!
//! Request inspection helpers and log redaction.

pub mod http;
pub mod redact;
pub mod route;

pub use http::*;
pub use redact::*;
pub use route::*;
