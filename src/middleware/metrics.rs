//! Metrics collection middleware.

use crate::{services::AppMetrics, utils::route::extract_route_pattern};
use actix_web::{
    Error,
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
    web,
};
use std::time::Instant;

/// Record request count and duration by method, route and status.
///
/// A no-op when no `AppMetrics` is registered as app data. Install with
/// `actix_web::middleware::from_fn`.
pub async fn metrics_middleware(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse, Error> {
    let started = Instant::now();
    let method = req.method().to_string();

    let res = next.call(req).await?;

    // The matched pattern is only known once routing has run
    let route = extract_route_pattern(res.request());
    if let Some(metrics) = res.request().app_data::<web::Data<AppMetrics>>() {
        metrics.record_request(&method, &route, res.status().as_u16(), started.elapsed());
        metrics.update_uptime();
    }

    Ok(res.map_into_boxed_body())
}
