//! Business logic and service layer modules.
//!
//! The authentication-and-forwarding pipeline lives here: the shared token
//! store, login handling, the upstream client, request forwarding and the
//! retrying request handler, plus Prometheus metrics.

pub mod auth_manager;
pub mod forwarder;
pub mod metrics;
pub mod retrying_handler;
pub mod token_store;
pub mod upstream_client;

pub use auth_manager::*;
pub use forwarder::*;
pub use metrics::*;
pub use retrying_handler::*;
pub use token_store::*;
pub use upstream_client::*;
