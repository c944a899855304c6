//! Configuration for the upstream HTTP client
//!
//! Provides environment-based configuration for the outbound client with
//! defaults suitable for production use.

use crate::services::upstream_client::UpstreamClientConfig;
use std::env;

impl UpstreamClientConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let read_timeout_seconds = env::var("UPSTREAM_READ_TIMEOUT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.read_timeout_seconds);

        let write_timeout_seconds = env::var("UPSTREAM_WRITE_TIMEOUT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.write_timeout_seconds);

        let connect_timeout_seconds = env::var("UPSTREAM_CONNECT_TIMEOUT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.connect_timeout_seconds);

        let enable_detailed_logging = env::var("UPSTREAM_DETAILED_LOGGING")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.enable_detailed_logging);

        Self {
            read_timeout_seconds,
            write_timeout_seconds,
            connect_timeout_seconds,
            enable_detailed_logging,
        }
    }
}
