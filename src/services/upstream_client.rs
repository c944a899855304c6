//! Outbound HTTP client shared by the login and resource calls.
//!
//! This module provides a thin wrapper over `reqwest` that:
//! - Applies per-operation timeouts (GET reads, POST writes)
//! - Attaches bearer tokens, query strings and JSON bodies
//! - Hands back every HTTP answer, 4xx/5xx included, as an `UpstreamResponse`
//! - Logs and records metrics per destination
//!
//! It never retries on its own. Retry policy belongs to the callers.

use crate::models::{ForwardMethod, QueryValue};
use crate::services::metrics::ProxyMetrics;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{error, info, warn};
use url::Url;

/// Configuration for the upstream HTTP client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamClientConfig {
    /// Timeout for read operations (in seconds)
    pub read_timeout_seconds: u64,

    /// Timeout for write operations (in seconds)
    pub write_timeout_seconds: u64,

    /// Connection timeout (in seconds)
    pub connect_timeout_seconds: u64,

    /// Enable detailed logging
    pub enable_detailed_logging: bool,
}

impl Default for UpstreamClientConfig {
    fn default() -> Self {
        Self {
            read_timeout_seconds: 10,
            write_timeout_seconds: 15,
            connect_timeout_seconds: 3,
            enable_detailed_logging: true,
        }
    }
}

/// One outbound call
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: ForwardMethod,
    pub url: Url,
    pub bearer_token: Option<String>,
    pub query: Vec<(String, QueryValue)>,
    pub json: Option<Value>,
}

impl UpstreamRequest {
    pub fn new(method: ForwardMethod, url: Url) -> Self {
        Self {
            method,
            url,
            bearer_token: None,
            query: Vec::new(),
            json: None,
        }
    }

    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn query(mut self, query: Vec<(String, QueryValue)>) -> Self {
        self.query = query;
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.json = Some(body);
        self
    }
}

/// The upstream's answer: status code plus raw body, whatever the status
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl UpstreamResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON; empty or undecodable bodies become `{}`
    pub fn json_body(&self) -> Value {
        serde_json::from_slice::<Value>(&self.body)
            .ok()
            .filter(|value| !value.is_null())
            .unwrap_or_else(|| Value::Object(Default::default()))
    }

    /// Lossy text view of the body, for logging
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Request context for logging and metrics
#[derive(Debug, Clone)]
struct RequestContext {
    destination: String,
    method: ForwardMethod,
    url: String,
    start_time: DateTime<Utc>,
}

/// Operation type for determining appropriate timeout
#[derive(Debug, Clone, Copy)]
enum OperationType {
    Read,
    Write,
}

impl From<ForwardMethod> for OperationType {
    fn from(method: ForwardMethod) -> Self {
        match method {
            ForwardMethod::Get => OperationType::Read,
            ForwardMethod::Post => OperationType::Write,
        }
    }
}

/// HTTP client for the upstream API and its login endpoint
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client,
    config: UpstreamClientConfig,
    metrics: Option<ProxyMetrics>,
}

impl UpstreamClient {
    /// Create a new upstream client
    pub fn new(
        config: UpstreamClientConfig,
        metrics: Option<ProxyMetrics>,
    ) -> Result<Self, UpstreamClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(std::cmp::max(
                config.read_timeout_seconds,
                config.write_timeout_seconds,
            )))
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            config,
            metrics,
        })
    }

    /// Send a request and capture the upstream response, error statuses included
    pub async fn send(
        &self,
        request: UpstreamRequest,
    ) -> Result<UpstreamResponse, UpstreamClientError> {
        let context = RequestContext {
            destination: extract_destination(&request.url),
            method: request.method,
            url: request.url.to_string(),
            start_time: Utc::now(),
        };
        let operation_type = OperationType::from(request.method);
        let timeout = match operation_type {
            OperationType::Read => Duration::from_secs(self.config.read_timeout_seconds),
            OperationType::Write => Duration::from_secs(self.config.write_timeout_seconds),
        };

        let mut builder = self
            .client
            .request(request.method.into(), request.url.clone());
        if let Some(token) = &request.bearer_token {
            builder = builder.bearer_auth(token);
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.json {
            builder = builder.json(body);
        }

        // The timeout covers the headers and the whole body
        let exchange = async {
            let response = builder.send().await?;
            let status = response.status().as_u16();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>(UpstreamResponse::new(status, body.to_vec()))
        };

        let start = std::time::Instant::now();
        let result = match tokio::time::timeout(timeout, exchange).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) if e.is_timeout() => Err(UpstreamClientError::Timeout),
            Ok(Err(e)) if e.is_builder() => Err(UpstreamClientError::Serialization(e.to_string())),
            Ok(Err(e)) => Err(UpstreamClientError::Network(e)),
            Err(_) => Err(UpstreamClientError::Timeout),
        };
        let duration = start.elapsed();

        match &result {
            Ok(response) => {
                if self.config.enable_detailed_logging {
                    info!(
                        destination = %context.destination,
                        method = %context.method,
                        url = %context.url,
                        status = response.status,
                        duration_ms = duration.as_millis(),
                        "Upstream request completed"
                    );
                }
                let outcome = if response.is_success() {
                    "success"
                } else {
                    "http_error"
                };
                self.record_request_metrics(&context, outcome, duration);
            }
            Err(UpstreamClientError::Timeout) => {
                if self.config.enable_detailed_logging {
                    warn!(
                        destination = %context.destination,
                        method = %context.method,
                        url = %context.url,
                        timeout_seconds = timeout.as_secs(),
                        "Upstream request timed out"
                    );
                }
                self.record_request_metrics(&context, "timeout", duration);
                self.record_timeout(&context, operation_type);
            }
            Err(e) => {
                if self.config.enable_detailed_logging {
                    error!(
                        destination = %context.destination,
                        method = %context.method,
                        url = %context.url,
                        error = %e,
                        started_at = %context.start_time.to_rfc3339(),
                        duration_ms = duration.as_millis(),
                        "Upstream request failed"
                    );
                }
                self.record_request_metrics(&context, "network_error", duration);
            }
        }

        result
    }

    fn record_request_metrics(&self, context: &RequestContext, outcome: &str, duration: Duration) {
        if let Some(metrics) = &self.metrics {
            metrics
                .upstream_requests_total
                .with_label_values(&[
                    context.destination.as_str(),
                    context.method.as_str(),
                    outcome,
                ])
                .inc();

            metrics
                .upstream_request_duration_seconds
                .with_label_values(&[context.destination.as_str(), context.method.as_str()])
                .observe(duration.as_secs_f64());
        }
    }

    fn record_timeout(&self, context: &RequestContext, operation_type: OperationType) {
        if let Some(metrics) = &self.metrics {
            let timeout_type = match operation_type {
                OperationType::Read => "read",
                OperationType::Write => "write",
            };
            metrics
                .upstream_timeouts_total
                .with_label_values(&[context.destination.as_str(), timeout_type])
                .inc();
        }
    }
}

/// Host of the URL, used to group metrics by destination
fn extract_destination(url: &Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => "unknown".to_string(),
    }
}

/// Errors that can occur reaching the upstream
#[derive(Debug, thiserror::Error)]
pub enum UpstreamClientError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request timed out")]
    Timeout,

    #[error("Invalid upstream URL: {0}")]
    InvalidUrl(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl UpstreamClientError {
    /// Status code reported to the caller for this failure
    pub fn status_code(&self) -> u16 {
        match self {
            UpstreamClientError::Network(_) | UpstreamClientError::InvalidUrl(_) => 502,
            UpstreamClientError::Timeout => 504,
            UpstreamClientError::Serialization(_) => 500,
        }
    }

    /// Get a user-friendly error message for API responses
    pub fn user_message(&self) -> String {
        match self {
            UpstreamClientError::Network(_) => {
                "Upstream service unreachable due to network issues".to_string()
            }
            UpstreamClientError::Timeout => {
                "Upstream service did not answer before the timeout".to_string()
            }
            UpstreamClientError::InvalidUrl(_) => {
                "Upstream service address is misconfigured".to_string()
            }
            UpstreamClientError::Serialization(_) => "Invalid request data".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn client() -> UpstreamClient {
        UpstreamClient::new(UpstreamClientConfig::default(), None).unwrap()
    }

    #[test]
    fn test_config_defaults() {
        let config = UpstreamClientConfig::default();
        assert_eq!(config.read_timeout_seconds, 10);
        assert_eq!(config.write_timeout_seconds, 15);
        assert!(config.enable_detailed_logging);
    }

    #[test]
    fn test_extract_destination() {
        let url = Url::parse("https://api.example.com/path").unwrap();
        assert_eq!(extract_destination(&url), "api.example.com");

        let url = Url::parse("http://127.0.0.1:8081/path").unwrap();
        assert_eq!(extract_destination(&url), "127.0.0.1:8081");
    }

    #[test]
    fn test_json_body_is_best_effort() {
        assert_eq!(
            UpstreamResponse::new(200, r#"{"id":1}"#).json_body(),
            json!({"id": 1})
        );
        assert_eq!(UpstreamResponse::new(500, "<html>").json_body(), json!({}));
        assert_eq!(UpstreamResponse::new(204, "").json_body(), json!({}));
        assert_eq!(UpstreamResponse::new(200, "[1,2]").json_body(), json!([1, 2]));
    }

    #[test]
    fn test_error_status_codes() {
        assert_eq!(UpstreamClientError::Timeout.status_code(), 504);
        assert_eq!(
            UpstreamClientError::InvalidUrl("x".to_string()).status_code(),
            502
        );
        assert!(UpstreamClientError::Timeout.user_message().contains("timeout"));
    }

    #[tokio::test]
    async fn test_error_status_is_returned_not_raised() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/cities")
            .with_status(503)
            .with_body(r#"{"error":"maintenance"}"#)
            .create_async()
            .await;

        let url = Url::parse(&format!("{}/cities", server.url())).unwrap();
        let response = client()
            .send(UpstreamRequest::new(ForwardMethod::Get, url))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, 503);
        assert_eq!(response.json_body(), json!({"error": "maintenance"}));
    }

    #[tokio::test]
    async fn test_bearer_query_and_json_are_attached() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/submissions")
            .match_header("authorization", "Bearer abc")
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .match_body(Matcher::Json(json!({"answer": 42})))
            .with_status(201)
            .with_body(r#"{"id":9}"#)
            .create_async()
            .await;

        let url = Url::parse(&format!("{}/submissions", server.url())).unwrap();
        let request = UpstreamRequest::new(ForwardMethod::Post, url)
            .bearer("abc")
            .query(vec![("page".to_string(), QueryValue::Int(2))])
            .json(json!({"answer": 42}));
        let response = client().send(request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, 201);
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_network_error() {
        // Port 9 (discard) is closed on test machines
        let url = Url::parse("http://127.0.0.1:9/cities").unwrap();
        let result = client()
            .send(UpstreamRequest::new(ForwardMethod::Get, url))
            .await;

        match result {
            Err(e) => assert!(matches!(e.status_code(), 502 | 504)),
            Ok(response) => panic!("expected transport error, got {}", response.status),
        }
    }

    /// Listener that accepts connections and never writes a byte back
    async fn silent_upstream() -> Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        Url::parse(&format!("http://{addr}/cities")).unwrap()
    }

    #[tokio::test]
    async fn test_slow_upstream_times_out() {
        let registry = prometheus::Registry::new();
        let metrics = ProxyMetrics::new(&registry).unwrap();
        let config = UpstreamClientConfig {
            read_timeout_seconds: 1,
            ..UpstreamClientConfig::default()
        };
        let client = UpstreamClient::new(config, Some(metrics.clone())).unwrap();

        let url = silent_upstream().await;
        let destination = extract_destination(&url);
        let err = client
            .send(UpstreamRequest::new(ForwardMethod::Get, url))
            .await
            .unwrap_err();

        assert!(matches!(err, UpstreamClientError::Timeout));
        assert_eq!(err.status_code(), 504);
        assert_eq!(
            metrics
                .upstream_timeouts_total
                .with_label_values(&[destination.as_str(), "read"])
                .get(),
            1.0
        );
        assert_eq!(
            metrics
                .upstream_requests_total
                .with_label_values(&[destination.as_str(), "GET", "timeout"])
                .get(),
            1.0
        );
    }
}
