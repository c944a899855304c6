//! Route pattern extraction utilities.

use actix_web::HttpRequest;

/// Label shared by every request that matched no route
pub const UNMATCHED_ROUTE: &str = "/unmatched";

/// Route label for metrics.
///
/// Uses the matched route pattern, so that `/api/statistics/1` and
/// `/api/statistics/2` share a label. Requests that matched nothing all land
/// on `UNMATCHED_ROUTE`; raw paths would let callers mint label values.
pub fn extract_route_pattern(req: &HttpRequest) -> String {
    req.match_pattern()
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test as actix_test;

    #[test]
    fn test_unrouted_request_uses_fixed_label() {
        for path in ["/scan-1", "/scan-2", "/wp-admin/setup.php"] {
            let req = actix_test::TestRequest::get().uri(path).to_http_request();
            assert_eq!(extract_route_pattern(&req), UNMATCHED_ROUTE);
        }
    }
}
