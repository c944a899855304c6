//! Per-request orchestration: fetch token, forward, recover once from a 401.
//!
//! ```text
//! FetchToken --token--> Forward --401, retry left--> FetchToken (forced login)
//!     |                    |
//!     | auth error         +--any other status, or 401 with no retry left--> Done
//!     v
//!   Done
//! ```
//!
//! `RetryState` lives on the stack of one `handle` call and allows exactly one
//! forced re-login, so the loop runs the forward step at most twice.

use crate::models::{ErrorPayload, ForwardSpec};
use crate::services::auth_manager::AuthManager;
use crate::services::forwarder::RequestForwarder;
use crate::services::metrics::ProxyMetrics;
use crate::services::token_store::{EXPIRED_KEY, TOKEN_KEY, TokenStore};
use crate::services::upstream_client::{UpstreamClientError, UpstreamResponse};
use crate::utils::redact::redact_sensitive_data;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Upstream reported the bearer token as invalid
const UNAUTHORIZED: u16 = 401;

/// How a request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Error,
}

/// Classified result handed back to the inbound caller
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyResponse {
    pub status: u16,
    pub body: Value,
    pub outcome: Outcome,
}

impl ProxyResponse {
    /// 200 and 201 pass as success; everything else is an error. Either way
    /// the upstream status and decoded body are kept.
    pub fn classify(response: &UpstreamResponse) -> Self {
        let outcome = match response.status {
            200 | 201 => Outcome::Success,
            _ => Outcome::Error,
        };

        Self {
            status: response.status,
            body: response.json_body(),
            outcome,
        }
    }

    pub fn from_payload(payload: ErrorPayload) -> Self {
        let status = payload.status_code;
        Self {
            status,
            body: serde_json::to_value(&payload)
                .unwrap_or_else(|_| Value::Object(Default::default())),
            outcome: Outcome::Error,
        }
    }

    fn from_transport_error(error: &UpstreamClientError) -> Self {
        Self::from_payload(ErrorPayload::new(error.user_message(), error.status_code()))
    }
}

/// Retry budget of one inbound request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    pub second_attempt_left: bool,
}

impl RetryState {
    pub fn new() -> Self {
        Self {
            second_attempt_left: true,
        }
    }

    /// The token fetch must bypass the cache once the retry was spent
    pub fn force_renew(&self) -> bool {
        !self.second_attempt_left
    }

    /// Spend the retry. Returns false if it was already spent.
    pub fn take_second_attempt(&mut self) -> bool {
        std::mem::replace(&mut self.second_attempt_left, false)
    }
}

impl Default for RetryState {
    fn default() -> Self {
        Self::new()
    }
}

enum State {
    FetchToken,
    Forward(String),
    Done(ProxyResponse),
}

/// Runs the fetch-token / forward / retry-once state machine.
pub struct RetryingHandler {
    auth: Arc<AuthManager>,
    forwarder: RequestForwarder,
    store: Arc<dyn TokenStore>,
    metrics: Option<ProxyMetrics>,
}

impl RetryingHandler {
    pub fn new(
        auth: Arc<AuthManager>,
        forwarder: RequestForwarder,
        store: Arc<dyn TokenStore>,
        metrics: Option<ProxyMetrics>,
    ) -> Self {
        Self {
            auth,
            forwarder,
            store,
            metrics,
        }
    }

    /// Serve one inbound request. Never fails: every path ends in a response.
    pub async fn handle(&self, spec: &ForwardSpec) -> ProxyResponse {
        let mut retry = RetryState::new();
        let mut state = State::FetchToken;

        loop {
            state = match state {
                State::FetchToken => match self.auth.get_token(retry.force_renew()).await {
                    Ok(token) => State::Forward(token),
                    Err(e) => {
                        warn!(
                            error = %e,
                            status = e.status_code(),
                            path = %spec.upstream_path,
                            "Could not obtain upstream token"
                        );
                        State::Done(ProxyResponse::from_payload(e.to_payload()))
                    }
                },
                State::Forward(token) => match self.forwarder.forward(spec, &token).await {
                    Ok(response)
                        if response.status == UNAUTHORIZED && retry.take_second_attempt() =>
                    {
                        info!(
                            path = %spec.upstream_path,
                            "Upstream rejected cached token, renewing"
                        );
                        self.invalidate_token().await;
                        State::FetchToken
                    }
                    Ok(response) => {
                        if !response.is_success() {
                            debug!(
                                status = response.status,
                                body = %redact_sensitive_data(&response.text()),
                                "Passing upstream error through"
                            );
                        }
                        State::Done(ProxyResponse::classify(&response))
                    }
                    Err(e) => {
                        warn!(
                            error = %e,
                            path = %spec.upstream_path,
                            "Upstream resource call failed"
                        );
                        State::Done(ProxyResponse::from_transport_error(&e))
                    }
                },
                State::Done(response) => return response,
            };
        }
    }

    /// Mark the shared token expired and drop it
    async fn invalidate_token(&self) {
        if let Err(e) = self.store.set(EXPIRED_KEY, "true".to_string()).await {
            warn!(error = %e, "Failed to flag token as expired");
        }
        if let Err(e) = self.store.delete(TOKEN_KEY).await {
            warn!(error = %e, "Failed to delete expired token");
        }
        if let Some(metrics) = &self.metrics {
            metrics.token_invalidations_total.inc();
        }
    }
}
