//! HTTP utility functions for extracting request information.

use actix_web::HttpRequest;

/// Extract client IP address from request headers
///
/// Attempts to extract the real client IP from various proxy headers,
/// falling back to the connection remote address.
pub fn extract_client_ip(req: &HttpRequest) -> String {
    let ip_headers = ["X-Forwarded-For", "X-Real-IP", "CF-Connecting-IP"];

    for header_name in &ip_headers {
        if let Some(header_str) = req.headers().get(*header_name).and_then(|h| h.to_str().ok()) {
            // X-Forwarded-For can contain multiple IPs, take the first one
            let ip = header_str.split(',').next().unwrap_or(header_str).trim();
            if !ip.is_empty() {
                return ip.to_string();
            }
        }
    }

    req.connection_info()
        .peer_addr()
        .unwrap_or("unknown")
        .to_string()
}

/// Extract user agent from request headers
pub fn extract_user_agent(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get("User-Agent")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_forwarded_for_takes_first_hop() {
        let req = TestRequest::default()
            .insert_header(("X-Forwarded-For", "203.0.113.7, 10.0.0.1"))
            .to_http_request();
        assert_eq!(extract_client_ip(&req), "203.0.113.7");
    }

    #[test]
    fn test_user_agent() {
        let req = TestRequest::default()
            .insert_header(("User-Agent", "curl/8.0"))
            .to_http_request();
        assert_eq!(extract_user_agent(&req).as_deref(), Some("curl/8.0"));
        assert_eq!(extract_user_agent(&TestRequest::default().to_http_request()), None);
    }
}
