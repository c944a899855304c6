//! Data models shared across the proxy.
//!
//! Wire formats for the inbound API and the upstream login endpoint, plus the
//! per-request forwarding types consumed by the service layer.

pub mod api;
pub mod auth;
pub mod forward;

pub use api::*;
pub use auth::*;
pub use forward::*;
