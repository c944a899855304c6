//! Livis Proxy - an authenticating HTTP proxy in front of the Livis API
//!
//! The proxy exposes a handful of resource routes, logs in to the upstream
//! API with its own credentials, caches the bearer token in a shared store
//! and retries a request once with a fresh token when the upstream answers
//! 401. Upstream status codes and JSON bodies are passed through.
//!
//! ## Architecture
//!
//! - `models/` - Request/response models and forwarding descriptors
//! - `handlers/` - HTTP handlers and the app factory
//! - `middleware/` - Request IDs and request metrics
//! - `services/` - Token store, login, upstream client, forwarding, retries
//! - `utils/` - Request inspection and log redaction helpers
//! - `config/` - Configuration structures and environment loading
//! - `logging` - Tracing subscriber setup
//!
//! ## Quick Start
//!
//! ```no_run
//! use livis_proxy::{
//!     AppMetrics, AppState, InMemoryTokenStore, MetricsConfig, ProxyState,
//!     UpstreamClientConfig, UpstreamConfig, create_app,
//! };
//! use std::sync::Arc;
//!
//! #[actix_web::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let upstream = UpstreamConfig::from_env()?;
//!     let metrics = AppMetrics::new()?;
//!     let proxy = ProxyState::build(
//!         &upstream,
//!         UpstreamClientConfig::from_env(),
//!         Arc::new(InMemoryTokenStore::new()),
//!         Some(metrics.proxy.clone()),
//!     )?;
//!     let state = AppState::new(proxy, metrics, MetricsConfig::from_env());
//!     let _app = create_app(state);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod handlers;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

pub use config::{ConfigError, MetricsConfig, ServerConfig, UpstreamConfig};
pub use handlers::{
    AppState, ProxyState, StartupError, create_app, create_openapi_spec, forward_resource,
    get_metrics, health, version,
};
pub use logging::{LogFormat, LoggingConfig, init_tracing};
pub use middleware::{REQUEST_ID_HEADER, metrics_middleware, request_id_middleware};
pub use models::{
    Credentials, ErrorPayload, ForwardMethod, ForwardSpec, HealthResponse, QueryValue,
    ResourceKind, ResourceRoute, VersionResponse,
};
pub use services::{
    AppMetrics, AuthError, AuthManager, InMemoryTokenStore, Outcome, ProxyMetrics,
    ProxyResponse, RequestForwarder, RetryingHandler, TokenStore, TokenStoreError,
    UpstreamClient, UpstreamClientConfig, UpstreamClientError,
};
pub use utils::{extract_client_ip, extract_route_pattern, extract_user_agent};
