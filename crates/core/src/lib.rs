//! Core types and shared functionality for buildguide.
//!
//! This crate provides:
//! - Build domain model and query parameters
//! - Indexed in-memory build store with cache-aside reads
//! - Persistent TTL cache with SQLite backend
//! - Query service, step catalog and provider seam
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod provider;
pub mod repository;
pub mod service;
pub mod steps;

pub use cache::{BuildCache, CacheStats, CacheStore};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use model::{
    BuildFilters, BuildRecord, BuildStep, BuildType, DEFAULT_PAGE_SIZE, Difficulty, MAX_PAGE_SIZE, Page, Pagination,
    PaginationMeta, SortField, SortOrder,
};
pub use provider::CatalogProvider;
pub use repository::{BuildRepository, IndexedBuildStore};
pub use service::{BuildGuide, BuildService, GuideEntry, RefreshOutcome};
pub use steps::StepCatalog;
