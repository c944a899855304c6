use actix_web::HttpServer;
use livis_proxy::{
    AppMetrics, AppState, InMemoryTokenStore, LoggingConfig, MetricsConfig, ProxyState,
    ServerConfig, UpstreamClientConfig, UpstreamConfig, create_app, init_tracing,
};
use std::sync::Arc;
use tracing::{error, info};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let logging = LoggingConfig::from_env();
    if let Err(e) = init_tracing(&logging) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let upstream = match UpstreamConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid upstream configuration");
            std::process::exit(1);
        }
    };

    let metrics = AppMetrics::new().map_err(std::io::Error::other)?;
    let proxy = ProxyState::build(
        &upstream,
        UpstreamClientConfig::from_env(),
        Arc::new(InMemoryTokenStore::new()),
        Some(metrics.proxy.clone()),
    )
    .map_err(std::io::Error::other)?;
    let state = AppState::new(proxy, metrics, MetricsConfig::from_env());

    let server = ServerConfig::from_env();
    info!(
        bind_address = %server.bind_address,
        upstream = %upstream.api_base_uri,
        "Starting Livis proxy"
    );

    HttpServer::new(move || create_app(state.clone()))
        .bind(&server.bind_address)?
        .run()
        .await
}
