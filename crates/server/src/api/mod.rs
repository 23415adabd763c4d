//! HTTP API handlers.

pub mod builds;
pub mod cache;
pub mod error;
pub mod system;
pub mod types;

use axum::extract::Query;
use axum::extract::rejection::QueryRejection;
use buildguide_core::{DEFAULT_PAGE_SIZE, Pagination};

use crate::api::error::{ApiError, api_validation_error};

/// Validated pagination with the listing defaults applied.
pub(crate) fn pagination(page: Option<i64>, size: Option<i64>) -> Result<Pagination, ApiError> {
    Ok(Pagination::new(page.unwrap_or(1), size.unwrap_or(i64::from(DEFAULT_PAGE_SIZE)))?)
}

/// Unwrap a query extractor, reporting malformed values as validation errors.
pub(crate) fn query<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query.map(|Query(q)| q).map_err(|e| api_validation_error(e.body_text()))
}
