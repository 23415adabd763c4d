//! Build listing, search, guide and refresh handlers.

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use buildguide_core::{
    BuildFilters, BuildGuide, BuildRecord, BuildType, Difficulty, Page, Pagination, PaginationMeta,
};

use crate::api::error::{ApiError, api_not_found, api_validation_error};
use crate::api::types::{BuildsResponse, FilterQuery, PageQuery, RefreshResponse, SearchQuery};
use crate::api::{pagination, query};
use crate::app::AppState;

fn envelope(page: Page<BuildRecord>, pagination: &Pagination, label: impl Into<String>) -> Json<BuildsResponse> {
    Json(BuildsResponse {
        pagination: PaginationMeta::new(pagination, page.total),
        data: page.items,
        build_type: label.into(),
    })
}

/// `GET /builds`
pub(crate) async fn list_builds(
    State(state): State<AppState>, params: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<BuildsResponse>, ApiError> {
    let params = query(params)?;
    let pagination = pagination(params.page, params.size)?;
    let page = state.service.list_all(pagination).await;
    Ok(envelope(page, &pagination, "all"))
}

/// `GET /builds/filter`
pub(crate) async fn filter_builds(
    State(state): State<AppState>, params: Result<Query<FilterQuery>, QueryRejection>,
) -> Result<Json<BuildsResponse>, ApiError> {
    let params = query(params)?;
    let pagination = pagination(params.page, params.size)?;
    let filters = BuildFilters::parse(
        params.build_type.as_deref(),
        params.difficulty.as_deref(),
        params.search.as_deref(),
        params.sort_by.as_deref(),
        params.sort_order.as_deref(),
    )?;
    let page = state.service.filtered(&filters, pagination).await;
    Ok(envelope(page, &pagination, "filtered"))
}

/// `GET /builds/types`
pub(crate) async fn build_types(State(state): State<AppState>) -> Json<Vec<BuildType>> {
    Json(state.service.build_types())
}

/// `GET /builds/difficulties`
pub(crate) async fn difficulties(State(state): State<AppState>) -> Json<Vec<Difficulty>> {
    Json(state.service.difficulties())
}

/// `GET /builds/search?q=`
pub(crate) async fn search_builds(
    State(state): State<AppState>, params: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<BuildsResponse>, ApiError> {
    let params = query(params)?;
    let q = params.q.ok_or_else(|| api_validation_error("query parameter q is required"))?;
    let pagination = pagination(params.page, params.size)?;
    let page = state.service.search(&q, pagination).await;
    Ok(envelope(page, &pagination, "search"))
}

/// `GET /builds/difficulty/:difficulty`
pub(crate) async fn builds_by_difficulty(
    State(state): State<AppState>, Path(difficulty): Path<String>, params: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<BuildsResponse>, ApiError> {
    let difficulty: Difficulty = difficulty.parse()?;
    let params = query(params)?;
    let pagination = pagination(params.page, params.size)?;
    let page = state.service.list_by_difficulty(difficulty, pagination).await;
    Ok(envelope(page, &pagination, difficulty.as_str()))
}

/// `GET /builds/name/:name`
///
/// Case-insensitive exact name match. Builds without steps get them from the
/// step catalog.
pub(crate) async fn build_by_name(
    State(state): State<AppState>, Path(name): Path<String>,
) -> Result<Json<BuildRecord>, ApiError> {
    state
        .service
        .find_by_name(&name)
        .await
        .map(Json)
        .ok_or_else(|| api_not_found(format!("no build named '{name}'")))
}

/// `GET /builds/:build_type`
pub(crate) async fn builds_by_type(
    State(state): State<AppState>, Path(build_type): Path<String>, params: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<BuildsResponse>, ApiError> {
    let build_type: BuildType = build_type.parse()?;
    let params = query(params)?;
    let pagination = pagination(params.page, params.size)?;
    let page = state.service.list_by_type(build_type, Some(pagination)).await;
    Ok(envelope(page, &pagination, build_type.as_str()))
}

/// `GET /builds/:build_type/guide`
pub(crate) async fn build_guide(
    State(state): State<AppState>, Path(build_type): Path<String>,
) -> Result<Json<BuildGuide>, ApiError> {
    let build_type: BuildType = build_type.parse()?;
    Ok(Json(state.service.guide(build_type).await?))
}

/// `POST /builds/refresh`
pub(crate) async fn refresh_builds(State(state): State<AppState>) -> Json<RefreshResponse> {
    let outcome = state.service.refresh().await;
    let message = if outcome.replaced {
        "builds refreshed from source"
    } else {
        "source returned no builds; kept current collection"
    };
    Json(RefreshResponse {
        message: message.to_string(),
        total: outcome.total,
        replaced: outcome.replaced,
        expired_cleared: outcome.expired_cleared,
        cache_stats: state.service.cache_stats().await,
    })
}
