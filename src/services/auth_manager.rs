//! Bearer token acquisition against the upstream login endpoint.

use crate::models::{Credentials, ErrorPayload, ForwardMethod, LoginResponse};
use crate::services::metrics::ProxyMetrics;
use crate::services::token_store::{EXPIRED_KEY, TOKEN_KEY, TokenStore};
use crate::services::upstream_client::{UpstreamClient, UpstreamClientError, UpstreamRequest};
use crate::utils::redact::redact_sensitive_data;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Why a token could not be obtained
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("Login request failed: {0}")]
    Transport(#[from] UpstreamClientError),

    #[error("Login response did not contain a token: {0}")]
    MalformedResponse(String),
}

impl AuthError {
    /// Status code surfaced to the caller; upstream statuses are preserved
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::Rejected { status, .. } => *status,
            AuthError::Transport(e) => e.status_code(),
            AuthError::MalformedResponse(_) => 502,
        }
    }

    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload::new(self.to_string(), self.status_code())
    }
}

/// Hands out the shared bearer token, logging in when needed.
pub struct AuthManager {
    client: UpstreamClient,
    store: Arc<dyn TokenStore>,
    login_url: Url,
    credentials: Credentials,
    metrics: Option<ProxyMetrics>,
}

impl AuthManager {
    pub fn new(
        client: UpstreamClient,
        store: Arc<dyn TokenStore>,
        login_url: Url,
        credentials: Credentials,
        metrics: Option<ProxyMetrics>,
    ) -> Self {
        Self {
            client,
            store,
            login_url,
            credentials,
            metrics,
        }
    }

    /// Return a usable token.
    ///
    /// Without `force_renew` a cached token is returned as-is and no network
    /// call is made. Otherwise exactly one login is attempted; on failure the
    /// store is left untouched.
    pub async fn get_token(&self, force_renew: bool) -> Result<String, AuthError> {
        if !force_renew {
            match self.store.get(TOKEN_KEY).await {
                Ok(Some(token)) => {
                    debug!("Using cached upstream token");
                    if let Some(metrics) = &self.metrics {
                        metrics.token_cache_hits_total.inc();
                    }
                    return Ok(token);
                }
                Ok(None) => debug!("No cached upstream token"),
                Err(e) => warn!(error = %e, "Token store read failed, logging in"),
            }
        }

        let result = self.login().await;
        let outcome = match &result {
            Ok(_) => "success",
            Err(AuthError::Rejected { .. }) => "rejected",
            Err(AuthError::Transport(_)) => "transport_error",
            Err(AuthError::MalformedResponse(_)) => "malformed",
        };
        if let Some(metrics) = &self.metrics {
            metrics
                .login_requests_total
                .with_label_values(&[outcome])
                .inc();
        }

        result
    }

    async fn login(&self) -> Result<String, AuthError> {
        info!(login_url = %self.login_url, "Logging in to upstream API");

        let body = serde_json::to_value(self.credentials.to_login_request())
            .map_err(|e| UpstreamClientError::Serialization(e.to_string()))?;
        let request = UpstreamRequest::new(ForwardMethod::Post, self.login_url.clone()).json(body);
        let response = self.client.send(request).await?;

        if !response.is_success() {
            warn!(status = response.status, "Upstream login rejected");
            debug!(body = %redact_sensitive_data(&response.text()), "Login error body");
            return Err(AuthError::Rejected {
                status: response.status,
                message: format!(
                    "Login request POST {} resulted in a {} response",
                    self.login_url, response.status
                ),
            });
        }

        let login: LoginResponse = serde_json::from_slice(&response.body)
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;

        if let Err(e) = self.store.set(TOKEN_KEY, login.token.clone()).await {
            warn!(error = %e, "Failed to cache upstream token");
        }
        if let Err(e) = self.store.set(EXPIRED_KEY, "false".to_string()).await {
            warn!(error = %e, "Failed to reset token expiry flag");
        }

        info!("Upstream login succeeded");
        Ok(login.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::token_store::{InMemoryTokenStore, SharedCacheEntry};
    use crate::services::upstream_client::UpstreamClientConfig;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn manager(server_url: &str, store: Arc<dyn TokenStore>) -> AuthManager {
        let client = UpstreamClient::new(UpstreamClientConfig::default(), None).unwrap();
        let login_url = Url::parse(&format!("{server_url}/login")).unwrap();
        AuthManager::new(
            client,
            store,
            login_url,
            Credentials::new("api@example.com", "secret"),
            None,
        )
    }

    #[tokio::test]
    async fn test_cached_token_skips_login() {
        let mut server = Server::new_async().await;
        let login = server
            .mock("POST", "/login")
            .expect(0)
            .create_async()
            .await;

        let store = Arc::new(InMemoryTokenStore::with_token("cached"));
        let token = manager(&server.url(), store).get_token(false).await.unwrap();

        assert_eq!(token, "cached");
        login.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_store_logs_in_and_caches() {
        let mut server = Server::new_async().await;
        let login = server
            .mock("POST", "/login")
            .match_body(Matcher::Json(
                json!({"email": "api@example.com", "password": "secret"}),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"token":"abc"}"#)
            .expect(1)
            .create_async()
            .await;

        let store = Arc::new(InMemoryTokenStore::new());
        let token = manager(&server.url(), store.clone())
            .get_token(false)
            .await
            .unwrap();

        assert_eq!(token, "abc");
        login.assert_async().await;
        let entry = SharedCacheEntry::load(store.as_ref()).await.unwrap();
        assert_eq!(entry.token.as_deref(), Some("abc"));
        assert!(!entry.expired);
    }

    #[tokio::test]
    async fn test_force_renew_overwrites_cached_token() {
        let mut server = Server::new_async().await;
        let login = server
            .mock("POST", "/login")
            .with_status(200)
            .with_body(r#"{"token":"fresh"}"#)
            .expect(1)
            .create_async()
            .await;

        let store = Arc::new(InMemoryTokenStore::with_token("stale"));
        let token = manager(&server.url(), store.clone())
            .get_token(true)
            .await
            .unwrap();

        assert_eq!(token, "fresh");
        login.assert_async().await;
        assert_eq!(
            store.get(TOKEN_KEY).await.unwrap().as_deref(),
            Some("fresh")
        );
    }

    #[tokio::test]
    async fn test_login_failure_keeps_store_untouched() {
        let mut server = Server::new_async().await;
        let login = server
            .mock("POST", "/login")
            .with_status(500)
            .with_body(r#"{"error":"boom"}"#)
            .expect(1)
            .create_async()
            .await;

        let store = Arc::new(InMemoryTokenStore::with_token("stale"));
        let err = manager(&server.url(), store.clone())
            .get_token(true)
            .await
            .unwrap_err();

        login.assert_async().await;
        assert_eq!(err.status_code(), 500);
        let payload = err.to_payload();
        assert_eq!(payload.status_code, 500);
        assert!(payload.message.contains("500"));
        assert_eq!(
            store.get(TOKEN_KEY).await.unwrap().as_deref(),
            Some("stale")
        );
    }

    #[tokio::test]
    async fn test_login_without_token_is_malformed() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/login")
            .with_status(200)
            .with_body(r#"{"message":"ok"}"#)
            .create_async()
            .await;

        let store = Arc::new(InMemoryTokenStore::new());
        let err = manager(&server.url(), store.clone())
            .get_token(false)
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::MalformedResponse(_)));
        assert_eq!(err.status_code(), 502);
        assert_eq!(store.get(TOKEN_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unreachable_login_is_transport_error() {
        let store = Arc::new(InMemoryTokenStore::new());
        let err = manager("http://127.0.0.1:9", store)
            .get_token(false)
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::Transport(_)));
        assert!(matches!(err.status_code(), 502 | 504));
    }
}
