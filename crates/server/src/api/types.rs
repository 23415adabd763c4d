//! Request and response bodies for the HTTP API.

use serde::{Deserialize, Serialize};

use buildguide_core::{BuildRecord, CacheStats, PaginationMeta};

/// JSON error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

/// Paginated list of builds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildsResponse {
    pub data: Vec<BuildRecord>,
    pub pagination: PaginationMeta,
    /// Which listing produced `data`: a build type, a difficulty, `all`,
    /// `search` or `filtered`.
    pub build_type: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterQuery {
    pub build_type: Option<String>,
    pub difficulty: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiInfo {
    pub message: String,
    pub version: String,
    pub endpoints: Vec<EndpointInfo>,
    pub cache_stats: CacheStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointInfo {
    pub method: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub builds: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub message: String,
    pub total: usize,
    pub replaced: bool,
    pub expired_cleared: u64,
    pub cache_stats: CacheStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatsResponse {
    pub cache_stats: CacheStats,
    pub message: String,
}
