//! Generic handler for every proxied resource route.
//!
//! Each route is registered with its `ResourceRoute` descriptor as
//! resource-level app data; the handler turns the inbound request into a
//! `ForwardSpec` and hands it to the shared `RetryingHandler`.

use crate::{
    config::UpstreamConfig,
    models::{ErrorPayload, ForwardMethod, ResourceRoute},
    services::{
        AuthManager, ProxyMetrics, ProxyResponse, RequestForwarder, RetryingHandler, TokenStore,
        UpstreamClient, UpstreamClientConfig, UpstreamClientError,
    },
};
use actix_web::{HttpRequest, HttpResponse, http::StatusCode, web};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Errors raised while wiring the proxy pipeline at startup
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Invalid login URL: {0}")]
    LoginUrl(#[from] url::ParseError),

    #[error("Failed to build upstream client: {0}")]
    Client(#[from] UpstreamClientError),
}

/// Everything the resource routes share across workers.
pub struct ProxyState {
    pub handler: RetryingHandler,
    pub routes: Vec<ResourceRoute>,
}

impl ProxyState {
    /// Wire one upstream client, one auth manager and one forwarder around
    /// the given token store.
    pub fn build(
        upstream: &UpstreamConfig,
        client_config: UpstreamClientConfig,
        store: Arc<dyn TokenStore>,
        metrics: Option<ProxyMetrics>,
    ) -> Result<Self, StartupError> {
        let client = UpstreamClient::new(client_config, metrics.clone())?;
        let auth = AuthManager::new(
            client.clone(),
            store.clone(),
            upstream.login_url()?,
            upstream.credentials.clone(),
            metrics.clone(),
        );
        let forwarder = RequestForwarder::new(client, upstream.api_base_uri.clone());
        let handler = RetryingHandler::new(Arc::new(auth), forwarder, store, metrics);

        Ok(Self {
            handler,
            routes: upstream.resource_routes(),
        })
    }
}

/// Forward one inbound request to the upstream resource bound to its route.
pub async fn forward_resource(
    req: HttpRequest,
    body: web::Bytes,
    route: web::Data<ResourceRoute>,
    state: web::Data<ProxyState>,
) -> HttpResponse {
    let query = match web::Query::<Vec<(String, String)>>::from_query(req.query_string()) {
        Ok(query) => query.into_inner(),
        Err(e) => {
            warn!(error = %e, "Rejected malformed query string");
            return error_response(ErrorPayload::new(format!("Invalid query string: {e}"), 400));
        }
    };

    let json_body = match route.method {
        ForwardMethod::Get => None,
        ForwardMethod::Post => match parse_json_body(&body) {
            Ok(value) => value,
            Err(payload) => {
                warn!(resource = route.kind.name(), "Rejected non-JSON request body");
                return error_response(payload);
            }
        },
    };

    let resource_id = req.match_info().get("id").map(str::to_string);
    let spec = route.forward_spec(resource_id, query, json_body);
    let response = state.handler.handle(&spec).await;

    debug!(
        resource = route.kind.name(),
        status = response.status,
        outcome = ?response.outcome,
        "Proxied request finished"
    );

    into_http_response(response)
}

/// Empty bodies travel upstream as no body at all.
pub fn parse_json_body(body: &[u8]) -> Result<Option<Value>, ErrorPayload> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| ErrorPayload::new(format!("Request body must be valid JSON: {e}"), 400))
}

fn into_http_response(response: ProxyResponse) -> HttpResponse {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);
    HttpResponse::build(status).json(response.body)
}

fn error_response(payload: ErrorPayload) -> HttpResponse {
    into_http_response(ProxyResponse::from_payload(payload))
}
