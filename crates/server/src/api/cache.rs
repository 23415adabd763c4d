//! Cache inspection handlers.

use axum::Json;
use axum::extract::State;

use crate::api::types::CacheStatsResponse;
use crate::app::AppState;

/// `GET /cache/stats`
pub(crate) async fn cache_stats(State(state): State<AppState>) -> Json<CacheStatsResponse> {
    let cache_stats = state.service.cache_stats().await;
    let message = format!("{} of {} cache entries active", cache_stats.active_entries, cache_stats.total_entries);
    Json(CacheStatsResponse { cache_stats, message })
}
