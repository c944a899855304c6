//! Configuration structures and loading utilities.
//!
//! Every structure is read once at startup from environment variables and is
//! read-only afterwards.

pub mod metrics;
pub mod server;
pub mod upstream;
pub mod upstream_client;

pub use metrics::*;
pub use server::*;
pub use upstream::*;
