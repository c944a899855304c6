//! Request ID middleware for tracing and logging.

use crate::utils::http::{extract_client_ip, extract_user_agent};
use actix_web::{
    Error,
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    http::header::{HeaderName, HeaderValue},
    middleware::Next,
};
use std::time::Instant;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

/// Header carrying the request ID in both directions
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Reuse an incoming `X-Request-ID` or generate a UUID.
///
/// Everything logged while the request is handled, including login and
/// upstream calls, runs inside a span carrying the ID. The ID is echoed on
/// the response. Install with `actix_web::middleware::from_fn`.
pub async fn request_id_middleware(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse, Error> {
    let started = Instant::now();
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let span = info_span!("request", request_id = %request_id);
    info!(
        parent: &span,
        method = %req.method(),
        path = %req.path(),
        ip_address = %extract_client_ip(req.request()),
        user_agent = ?extract_user_agent(req.request()),
        "Incoming request"
    );

    let mut res = next.call(req).instrument(span.clone()).await?;

    res.headers_mut().insert(
        HeaderName::from_static(REQUEST_ID_HEADER),
        HeaderValue::from_str(&request_id).unwrap_or_else(|_| HeaderValue::from_static("invalid")),
    );

    info!(
        parent: &span,
        status = res.status().as_u16(),
        duration_ms = started.elapsed().as_millis(),
        "Request completed"
    );

    Ok(res.map_into_boxed_body())
}
