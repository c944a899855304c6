//! HTTP request handlers for API endpoints.
//!
//! Operational endpoints (health, version, metrics) are documented through
//! paperclip; the proxied resources share one generic forwarding handler.

pub mod health;
pub mod metrics;
pub mod openapi;
pub mod proxy;
pub mod version;

pub use health::*;
pub use metrics::*;
pub use openapi::*;
pub use proxy::*;
pub use version::*;
