//! HTTP application wiring.
//!
//! Builds the Axum router, configures middleware, and defines the shared
//! application state injected into handlers.

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::{Request, State};
use axum::http::{HeaderValue, Method, header};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use buildguide_core::{AppConfig, BuildService};

use crate::api;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<BuildService>,
    pub cors_origins: Vec<String>,
    /// `max-age` for successful GET responses.
    pub cache_max_age_secs: u64,
}

impl AppState {
    pub fn new(service: Arc<BuildService>, config: &AppConfig) -> Self {
        Self {
            service,
            cors_origins: config.cors_origins.clone(),
            cache_max_age_secs: config.http_cache_max_age_secs,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
        tracing::info_span!(
            "http.request",
            method = %request.method(),
            uri = %request.uri(),
            version = ?request.version()
        )
    });

    Router::new()
        .route("/", get(api::system::api_info))
        .route("/health", get(api::system::health))
        .route("/builds", get(api::builds::list_builds))
        .route("/builds/filter", get(api::builds::filter_builds))
        .route("/builds/types", get(api::builds::build_types))
        .route("/builds/difficulties", get(api::builds::difficulties))
        .route("/builds/search", get(api::builds::search_builds))
        .route("/builds/refresh", post(api::builds::refresh_builds))
        .route("/builds/difficulty/:difficulty", get(api::builds::builds_by_difficulty))
        .route("/builds/name/:name", get(api::builds::build_by_name))
        .route("/builds/:build_type", get(api::builds::builds_by_type))
        .route("/builds/:build_type/guide", get(api::builds::build_guide))
        .route("/cache/stats", get(api::cache::cache_stats))
        .layer(middleware::from_fn_with_state(state.cache_max_age_secs, cache_control))
        .layer(middleware::from_fn(process_time))
        .layer(CompressionLayer::new())
        .layer(cors_layer(&state.cors_origins))
        .layer(trace_layer)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// Adds `x-process-time` (milliseconds) to every response.
async fn process_time(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let mut response = next.run(request).await;
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    if let Ok(value) = HeaderValue::from_str(&format!("{elapsed_ms:.2}")) {
        response.headers_mut().insert("x-process-time", value);
    }
    response
}

/// Marks successful GET responses as publicly cacheable.
async fn cache_control(State(max_age): State<u64>, request: Request, next: Next) -> Response {
    let is_get = request.method() == Method::GET;
    let mut response = next.run(request).await;
    if is_get
        && response.status().is_success()
        && let Ok(value) = HeaderValue::from_str(&format!("public, max-age={max_age}"))
    {
        response.headers_mut().insert(header::CACHE_CONTROL, value);
    }
    response
}
