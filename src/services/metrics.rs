//! Metrics collection and Prometheus integration service.

use prometheus::{
    Counter, CounterVec, Gauge, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::time::{Duration, Instant};

/// Commit recorded at build time, if the build ran inside a git checkout
pub const BUILD_COMMIT: &str = match option_env!("VERGEN_GIT_SHA") {
    Some(sha) => sha,
    None => "unknown",
};

/// Build timestamp recorded by vergen
pub const BUILD_TIMESTAMP: &str = match option_env!("VERGEN_BUILD_TIMESTAMP") {
    Some(ts) => ts,
    None => "unknown",
};

/// Application metrics collector for Prometheus integration
#[derive(Clone)]
pub struct AppMetrics {
    pub registry: Registry,
    pub http_requests_total: CounterVec,
    pub http_request_duration_seconds: HistogramVec,
    pub app_uptime_seconds: Gauge,
    pub app_info: CounterVec,
    pub proxy: ProxyMetrics,
    pub start_time: Instant,
}

impl AppMetrics {
    /// Create a new metrics collector with inbound HTTP and proxy metrics
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total = CounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            &["method", "status", "route"],
        )?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["method", "route"],
        )?;

        let app_uptime_seconds = Gauge::new("app_uptime_seconds", "Application uptime in seconds")?;

        let app_info = CounterVec::new(
            Opts::new("app_info", "Application information"),
            &["version", "commit", "build_time"],
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(app_uptime_seconds.clone()))?;
        registry.register(Box::new(app_info.clone()))?;

        let proxy = ProxyMetrics::new(&registry)?;

        app_info
            .with_label_values(&[env!("CARGO_PKG_VERSION"), BUILD_COMMIT, BUILD_TIMESTAMP])
            .inc();

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            app_uptime_seconds,
            app_info,
            proxy,
            start_time: Instant::now(),
        })
    }

    /// Record an HTTP request with method, route, status, and duration
    pub fn record_request(&self, method: &str, route: &str, status: u16, duration: Duration) {
        if route == "/api/metrics" {
            // Scrapes would otherwise dominate the counters
            return;
        }

        self.http_requests_total
            .with_label_values(&[method, &status.to_string(), route])
            .inc();

        self.http_request_duration_seconds
            .with_label_values(&[method, route])
            .observe(duration.as_secs_f64());
    }

    /// Update the application uptime gauge
    pub fn update_uptime(&self) {
        let uptime = self.start_time.elapsed().as_secs_f64();
        self.app_uptime_seconds.set(uptime);
    }

    /// Render metrics in Prometheus text format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder.encode_to_string(&metric_families)
    }
}

/// Metrics for upstream calls and token handling
#[derive(Clone)]
pub struct ProxyMetrics {
    /// Upstream requests by destination, method, and outcome
    pub upstream_requests_total: CounterVec,

    /// Upstream request duration by destination and method
    pub upstream_request_duration_seconds: HistogramVec,

    /// Upstream timeouts by destination and type
    pub upstream_timeouts_total: CounterVec,

    /// Login calls by outcome
    pub login_requests_total: CounterVec,

    /// Token requests answered from the shared store
    pub token_cache_hits_total: Counter,

    /// Cached tokens dropped after an upstream 401
    pub token_invalidations_total: Counter,
}

impl ProxyMetrics {
    /// Create proxy metrics and register them on `registry`
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let upstream_requests_total = CounterVec::new(
            Opts::new(
                "upstream_requests_total",
                "Total upstream requests by destination, method, and outcome",
            ),
            &["destination", "method", "outcome"],
        )?;

        let upstream_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "upstream_request_duration_seconds",
                "Duration of upstream requests",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["destination", "method"],
        )?;

        let upstream_timeouts_total = CounterVec::new(
            Opts::new(
                "upstream_timeouts_total",
                "Total upstream timeouts by destination and type",
            ),
            &["destination", "timeout_type"],
        )?;

        let login_requests_total = CounterVec::new(
            Opts::new("login_requests_total", "Total login requests by outcome"),
            &["outcome"],
        )?;

        let token_cache_hits_total = Counter::new(
            "token_cache_hits_total",
            "Token requests served from the shared token store",
        )?;

        let token_invalidations_total = Counter::new(
            "token_invalidations_total",
            "Cached tokens invalidated after an upstream 401",
        )?;

        registry.register(Box::new(upstream_requests_total.clone()))?;
        registry.register(Box::new(upstream_request_duration_seconds.clone()))?;
        registry.register(Box::new(upstream_timeouts_total.clone()))?;
        registry.register(Box::new(login_requests_total.clone()))?;
        registry.register(Box::new(token_cache_hits_total.clone()))?;
        registry.register(Box::new(token_invalidations_total.clone()))?;

        Ok(Self {
            upstream_requests_total,
            upstream_request_duration_seconds,
            upstream_timeouts_total,
            login_requests_total,
            token_cache_hits_total,
            token_invalidations_total,
        })
    }
}
