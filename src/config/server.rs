//! HTTP server configuration.

use std::env;

const LOCAL_BIND_ADDRESS: &str = "127.0.0.1:8080";
const CONTAINER_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Where the proxy listens for inbound requests
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: LOCAL_BIND_ADDRESS.to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// `BIND_ADDRESS` wins; otherwise containers (Kubernetes or Docker) bind
    /// on all interfaces and local runs bind on loopback.
    pub fn from_env() -> Self {
        let bind_address = detect_bind_address(
            env::var("KUBERNETES_SERVICE_HOST").ok().as_deref(),
            env::var("DOCKER_CONTAINER").ok().as_deref(),
            env::var("BIND_ADDRESS").ok().as_deref(),
        );

        Self { bind_address }
    }
}

fn detect_bind_address(
    k8s_host: Option<&str>,
    docker: Option<&str>,
    bind_override: Option<&str>,
) -> String {
    if let Some(bind) = bind_override.filter(|b| !b.trim().is_empty()) {
        return bind.trim().to_string();
    }

    if k8s_host.is_some() || docker.is_some() {
        CONTAINER_BIND_ADDRESS.to_string()
    } else {
        LOCAL_BIND_ADDRESS.to_string()
    }
}
