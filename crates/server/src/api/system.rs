//! Service metadata and health handlers.

use axum::Json;
use axum::extract::State;

use crate::api::types::{ApiInfo, EndpointInfo, HealthStatus};
use crate::app::AppState;

const ENDPOINTS: &[(&str, &str)] = &[
    ("GET", "/health"),
    ("GET", "/builds"),
    ("GET", "/builds/filter"),
    ("GET", "/builds/types"),
    ("GET", "/builds/difficulties"),
    ("GET", "/builds/search?q={query}"),
    ("GET", "/builds/{build_type}"),
    ("GET", "/builds/{build_type}/guide"),
    ("GET", "/builds/difficulty/{difficulty}"),
    ("GET", "/builds/name/{name}"),
    ("POST", "/builds/refresh"),
    ("GET", "/cache/stats"),
];

/// `GET /`
pub(crate) async fn api_info(State(state): State<AppState>) -> Json<ApiInfo> {
    Json(ApiInfo {
        message: "AoE2 build guide API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        endpoints: ENDPOINTS
            .iter()
            .map(|(method, path)| EndpointInfo { method: method.to_string(), path: path.to_string() })
            .collect(),
        cache_stats: state.service.cache_stats().await,
    })
}

/// `GET /health`
pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus { status: "healthy".to_string(), builds: state.service.build_count().await })
}
