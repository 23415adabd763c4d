//! Domain cache facade: maps build queries onto cache keys.

use std::time::Duration;

use super::connection::CacheStore;
use super::hash::hash_query;
use crate::model::{BuildRecord, BuildType, Difficulty};

pub const ALL_BUILDS_KEY: &str = "all-builds";
pub const BY_TYPE_PREFIX: &str = "builds-by-type:";
pub const BY_DIFFICULTY_PREFIX: &str = "builds-by-difficulty:";
pub const SEARCH_PREFIX: &str = "search:";

pub const DEFAULT_LISTING_TTL: Duration = Duration::from_secs(3600);
pub const DEFAULT_SEARCH_TTL: Duration = Duration::from_secs(1800);

/// Typed view over [`CacheStore`] for the four build query shapes.
///
/// Every value is the full, unpaginated result of its query.
#[derive(Clone, Debug)]
pub struct BuildCache {
    store: CacheStore,
    listing_ttl: Duration,
    search_ttl: Duration,
}

pub fn type_key(build_type: BuildType) -> String {
    format!("{BY_TYPE_PREFIX}{build_type}")
}

pub fn difficulty_key(difficulty: Difficulty) -> String {
    format!("{BY_DIFFICULTY_PREFIX}{difficulty}")
}

/// Search keys hash the normalized query text.
pub fn search_key(query: &str) -> String {
    format!("{SEARCH_PREFIX}{}", hash_query(query))
}

impl BuildCache {
    pub fn new(store: CacheStore) -> Self {
        Self::with_ttls(store, DEFAULT_LISTING_TTL, DEFAULT_SEARCH_TTL)
    }

    pub fn with_ttls(store: CacheStore, listing_ttl: Duration, search_ttl: Duration) -> Self {
        Self { store, listing_ttl, search_ttl }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub async fn get_all(&self) -> Option<Vec<BuildRecord>> {
        self.store.get(ALL_BUILDS_KEY).await
    }

    pub async fn put_all(&self, builds: &[BuildRecord]) -> bool {
        self.store.set(ALL_BUILDS_KEY, builds, Some(self.listing_ttl)).await
    }

    pub async fn get_by_type(&self, build_type: BuildType) -> Option<Vec<BuildRecord>> {
        self.store.get(&type_key(build_type)).await
    }

    pub async fn put_by_type(&self, build_type: BuildType, builds: &[BuildRecord]) -> bool {
        self.store.set(&type_key(build_type), builds, Some(self.listing_ttl)).await
    }

    pub async fn get_by_difficulty(&self, difficulty: Difficulty) -> Option<Vec<BuildRecord>> {
        self.store.get(&difficulty_key(difficulty)).await
    }

    pub async fn put_by_difficulty(&self, difficulty: Difficulty, builds: &[BuildRecord]) -> bool {
        self.store.set(&difficulty_key(difficulty), builds, Some(self.listing_ttl)).await
    }

    pub async fn get_search(&self, query: &str) -> Option<Vec<BuildRecord>> {
        self.store.get(&search_key(query)).await
    }

    pub async fn put_search(&self, query: &str, builds: &[BuildRecord]) -> bool {
        self.store.set(&search_key(query), builds, Some(self.search_ttl)).await
    }

    /// Drop every build-derived entry: the full listing and all three
    /// keyed namespaces.
    ///
    /// Returns the number of removed entries.
    pub async fn invalidate_all(&self) -> u64 {
        let mut removed = u64::from(self.store.delete(ALL_BUILDS_KEY).await);
        for prefix in [BY_TYPE_PREFIX, BY_DIFFICULTY_PREFIX, SEARCH_PREFIX] {
            removed += self.store.delete_prefix(prefix).await;
        }
        tracing::info!(removed, "invalidated build cache");
        removed
    }
}
