//! OpenAPI specification generation and app factory.

use crate::{
    config::MetricsConfig,
    handlers::{forward_resource, get_metrics, health, version, ProxyState},
    middleware::{metrics_middleware, request_id_middleware},
    services::AppMetrics,
};
use actix_web::{App, middleware::from_fn};
use paperclip::actix::{OpenApiExt, web};
use paperclip::v2::models::{DefaultApiRaw, Info};

/// Creates the shared OpenAPI specification for the API
///
/// Only the operational endpoints carry schemas; the proxied resources
/// mirror whatever the upstream API returns.
pub fn create_openapi_spec() -> DefaultApiRaw {
    DefaultApiRaw {
        info: Info {
            title: "Livis Proxy".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            description: Some(
                "Authenticating proxy in front of the Livis API.\n\n\
                ## Proxied resources\n\
                - `GET /api/cities`\n\
                - `GET /api/page-content`\n\
                - `GET /api/statistics`\n\
                - `GET /api/statistics/{id}`\n\
                - `POST /api/submission`\n\
                \n\
                The proxy logs in with its own credentials, caches the bearer token and \
                retries a request once with a fresh token when the upstream answers 401. \
                Upstream status codes and JSON bodies are passed through unchanged.\n\
                \n\
                **Query parameters:**\n\
                - `city_name` is forwarded as `city.name`\n\
                - Numeric values are forwarded as integers\n\
                \n\
                **Errors raised by the proxy itself:**\n\
                ```json\n\
                { \"message\": \"...\", \"status_code\": 502 }\n\
                ```"
                .into(),
            ),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Shared state handed to every worker's app
#[derive(Clone)]
pub struct AppState {
    pub proxy: actix_web::web::Data<ProxyState>,
    pub metrics: actix_web::web::Data<AppMetrics>,
    pub metrics_config: MetricsConfig,
}

impl AppState {
    pub fn new(proxy: ProxyState, metrics: AppMetrics, metrics_config: MetricsConfig) -> Self {
        Self {
            proxy: actix_web::web::Data::new(proxy),
            metrics: actix_web::web::Data::new(metrics),
            metrics_config,
        }
    }
}

/// Creates the application
///
/// Wires request IDs, request metrics, the documented operational endpoints
/// and one route per proxied resource. Used by `main` and by tests.
pub fn create_app(
    state: AppState,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let mut app = App::new()
        .wrap(from_fn(request_id_middleware))
        .wrap(from_fn(metrics_middleware))
        .wrap_api_with_spec(create_openapi_spec())
        .app_data(web::Data::new(state.metrics_config.clone()))
        .app_data(state.metrics.clone())
        .app_data(state.proxy.clone())
        .service(web::resource("/api/health").route(web::get().to(health)))
        .service(web::resource("/api/version").route(web::get().to(version)))
        .service(web::resource("/api/metrics").route(web::get().to(get_metrics)))
        .with_json_spec_at("/api/spec/v2")
        .build();

    // Resource routes take untyped JSON and stay out of the generated spec
    for route in state.proxy.routes.iter().cloned() {
        let method = route.method.into();
        app = app.service(
            actix_web::web::resource(route.route)
                .app_data(actix_web::web::Data::new(route))
                .route(actix_web::web::method(method).to(forward_resource)),
        );
    }

    app
}
