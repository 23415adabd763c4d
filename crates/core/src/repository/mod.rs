//! Indexed in-memory build store with cache-aside reads.
//!
//! The store owns exactly one [`Snapshot`] at a time. Readers hold the
//! snapshot's read guard for the whole cache-aside path and `refresh` holds
//! the write guard across swap, invalidation and re-seed, so a reader never
//! observes a half-built index or writes a superseded result into the cache.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::cache::BuildCache;
use crate::model::{BuildFilters, BuildRecord, BuildType, Difficulty, Page, Pagination};

pub mod index;
pub mod query;

pub use index::{BuildIndex, Snapshot};

/// Read and replace operations over the authoritative build collection.
///
/// Every listing returns the requested page together with the unpaginated
/// total. `None` pagination returns the full result.
#[async_trait]
pub trait BuildRepository: Send + Sync {
    async fn get_all(&self, pagination: Option<Pagination>) -> Page<BuildRecord>;

    async fn get_by_type(&self, build_type: BuildType, pagination: Option<Pagination>) -> Page<BuildRecord>;

    async fn get_by_difficulty(&self, difficulty: Difficulty, pagination: Option<Pagination>) -> Page<BuildRecord>;

    async fn search(&self, query: &str, pagination: Option<Pagination>) -> Page<BuildRecord>;

    /// Uncached combined filter and sort.
    async fn get_filtered(&self, filters: &BuildFilters, pagination: Option<Pagination>) -> Page<BuildRecord>;

    /// Replace the whole collection. Returns the new record count.
    async fn refresh(&self, builds: Vec<BuildRecord>) -> usize;

    /// Adopt the persisted full listing as the collection.
    ///
    /// Used at startup when the provider has nothing to offer. Returns the
    /// number of restored records; 0 leaves the store untouched.
    async fn restore_from_cache(&self) -> usize;

    async fn find_by_name(&self, name: &str) -> Option<BuildRecord>;

    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// [`BuildRepository`] backed by an indexed snapshot and a [`BuildCache`].
pub struct IndexedBuildStore {
    snapshot: RwLock<Arc<Snapshot>>,
    cache: BuildCache,
}

impl IndexedBuildStore {
    /// An empty store. Populate it with [`BuildRepository::refresh`] or
    /// [`BuildRepository::restore_from_cache`].
    pub fn new(cache: BuildCache) -> Self {
        Self { snapshot: RwLock::new(Arc::new(Snapshot::default())), cache }
    }

    pub fn cache(&self) -> &BuildCache {
        &self.cache
    }
}

fn log_read(query: &'static str, hit: bool, total: usize, started: Instant) {
    tracing::debug!(
        query,
        cache = if hit { "HIT" } else { "MISS" },
        total,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "build query"
    );
}

#[async_trait]
impl BuildRepository for IndexedBuildStore {
    async fn get_all(&self, pagination: Option<Pagination>) -> Page<BuildRecord> {
        let started = Instant::now();
        let snapshot = self.snapshot.read().await;

        let (builds, hit) = match self.cache.get_all().await {
            Some(builds) => (builds, true),
            None => {
                let builds = snapshot.records.clone();
                self.cache.put_all(&builds).await;
                (builds, false)
            }
        };

        log_read("all", hit, builds.len(), started);
        Page::from_full(&builds, pagination.as_ref())
    }

    async fn get_by_type(&self, build_type: BuildType, pagination: Option<Pagination>) -> Page<BuildRecord> {
        let started = Instant::now();
        let snapshot = self.snapshot.read().await;

        let (builds, hit) = match self.cache.get_by_type(build_type).await {
            Some(builds) => (builds, true),
            None => {
                let builds = snapshot.by_type(build_type);
                self.cache.put_by_type(build_type, &builds).await;
                (builds, false)
            }
        };

        log_read("by_type", hit, builds.len(), started);
        Page::from_full(&builds, pagination.as_ref())
    }

    async fn get_by_difficulty(&self, difficulty: Difficulty, pagination: Option<Pagination>) -> Page<BuildRecord> {
        let started = Instant::now();
        let snapshot = self.snapshot.read().await;

        let (builds, hit) = match self.cache.get_by_difficulty(difficulty).await {
            Some(builds) => (builds, true),
            None => {
                let builds = snapshot.by_difficulty(difficulty);
                self.cache.put_by_difficulty(difficulty, &builds).await;
                (builds, false)
            }
        };

        log_read("by_difficulty", hit, builds.len(), started);
        Page::from_full(&builds, pagination.as_ref())
    }

    async fn search(&self, query: &str, pagination: Option<Pagination>) -> Page<BuildRecord> {
        let started = Instant::now();
        let snapshot = self.snapshot.read().await;

        let (builds, hit) = match self.cache.get_search(query).await {
            Some(builds) => (builds, true),
            None => {
                let builds = query::search(&snapshot.records, query);
                self.cache.put_search(query, &builds).await;
                (builds, false)
            }
        };

        log_read("search", hit, builds.len(), started);
        Page::from_full(&builds, pagination.as_ref())
    }

    async fn get_filtered(&self, filters: &BuildFilters, pagination: Option<Pagination>) -> Page<BuildRecord> {
        let started = Instant::now();
        let builds = {
            let snapshot = self.snapshot.read().await;
            query::filter(&snapshot, filters)
        };

        tracing::debug!(
            total = builds.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "filtered build query"
        );
        Page::from_full(&builds, pagination.as_ref())
    }

    async fn refresh(&self, builds: Vec<BuildRecord>) -> usize {
        let started = Instant::now();
        let next = Arc::new(Snapshot::new(builds));
        let count = next.len();

        let mut current = self.snapshot.write().await;
        *current = next;
        self.cache.invalidate_all().await;
        self.cache.put_all(&current.records).await;
        drop(current);

        tracing::info!(count, elapsed_ms = started.elapsed().as_millis() as u64, "refreshed build collection");
        count
    }

    async fn restore_from_cache(&self) -> usize {
        let mut current = self.snapshot.write().await;
        match self.cache.get_all().await {
            Some(builds) if !builds.is_empty() => {
                let count = builds.len();
                *current = Arc::new(Snapshot::new(builds));
                tracing::info!(count, "restored builds from cache");
                count
            }
            _ => {
                tracing::warn!("no cached builds to restore");
                0
            }
        }
    }

    async fn find_by_name(&self, name: &str) -> Option<BuildRecord> {
        self.snapshot.read().await.find_by_name(name).cloned()
    }

    async fn len(&self) -> usize {
        self.snapshot.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStore;
    use crate::cache::builds::{ALL_BUILDS_KEY, type_key};

    fn scout_rush() -> BuildRecord {
        BuildRecord::new("Scout Rush", BuildType::FeudalRush, Difficulty::Intermediate)
    }

    fn fast_castle() -> BuildRecord {
        BuildRecord::new("Fast Castle A", BuildType::FastCastle, Difficulty::Beginner)
    }

    async fn store_with(builds: Vec<BuildRecord>) -> IndexedBuildStore {
        let cache = BuildCache::new(CacheStore::open_in_memory().await.unwrap());
        let store = IndexedBuildStore::new(cache);
        store.refresh(builds).await;
        store
    }

    fn many(n: usize) -> Vec<BuildRecord> {
        (0..n)
            .map(|i| {
                let build_type = BuildType::ALL[i % BuildType::ALL.len()];
                let difficulty = Difficulty::ALL[i % Difficulty::ALL.len()];
                BuildRecord::new(format!("Build {i:02}"), build_type, difficulty)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_example_scenario() {
        let store = store_with(vec![scout_rush(), fast_castle()]).await;

        let by_type = store.get_by_type(BuildType::FeudalRush, None).await;
        assert_eq!(by_type, Page { items: vec![scout_rush()], total: 1 });

        let filters = BuildFilters { difficulty: Some(Difficulty::Beginner), ..Default::default() };
        let filtered = store.get_filtered(&filters, None).await;
        assert_eq!(filtered, Page { items: vec![fast_castle()], total: 1 });

        let found = store.search("rush", None).await;
        assert_eq!(found, Page { items: vec![scout_rush()], total: 1 });
    }

    #[tokio::test]
    async fn test_pagination_bounds_and_total() {
        let store = store_with(many(23)).await;

        for (page, size) in [(1, 1), (1, 10), (3, 10), (2, 100), (1, 100)] {
            let pagination = Pagination::new(page, size).unwrap();
            let result = store.get_all(Some(pagination)).await;
            assert!(result.items.len() <= size as usize);
            assert_eq!(result.total, 23);
        }

        let last = store.get_all(Some(Pagination::new(3, 10).unwrap())).await;
        assert_eq!(last.items.len(), 3);
        assert_eq!(last.items[0].name, "Build 20");
    }

    #[tokio::test]
    async fn test_page_past_end_is_empty() {
        let store = store_with(many(5)).await;
        let result = store.get_all(Some(Pagination::new(9, 10).unwrap())).await;
        assert!(result.items.is_empty());
        assert_eq!(result.total, 5);
    }

    #[tokio::test]
    async fn test_refresh_then_get_all_preserves_order() {
        let store = store_with(vec![scout_rush()]).await;
        let next = many(7);

        assert_eq!(store.refresh(next.clone()).await, 7);
        let result = store.get_all(None).await;
        assert_eq!(result.items, next);
        assert_eq!(result.total, 7);
    }

    #[tokio::test]
    async fn test_refresh_reseeds_and_invalidates_cache() {
        let store = store_with(vec![scout_rush()]).await;
        // Warm a keyed entry with the old collection.
        assert_eq!(store.get_by_type(BuildType::FeudalRush, None).await.total, 1);
        assert!(store.cache().store().entry(&type_key(BuildType::FeudalRush)).await.unwrap().is_some());

        store.refresh(vec![fast_castle()]).await;

        assert!(store.cache().store().entry(&type_key(BuildType::FeudalRush)).await.unwrap().is_none());
        assert_eq!(store.cache().get_all().await, Some(vec![fast_castle()]));
        assert_eq!(store.get_by_type(BuildType::FeudalRush, None).await.total, 0);
        assert_eq!(store.get_by_type(BuildType::FastCastle, None).await.total, 1);
    }

    #[tokio::test]
    async fn test_miss_populates_cache_before_returning() {
        let store = store_with(vec![scout_rush(), fast_castle()]).await;
        assert!(store.cache().get_search("castle").await.is_none());

        store.search("castle", None).await;

        assert_eq!(store.cache().get_search("castle").await, Some(vec![fast_castle()]));
    }

    #[tokio::test]
    async fn test_cached_result_is_served_on_hit() {
        let store = store_with(vec![scout_rush()]).await;
        // A planted entry proves the read path consults the cache first.
        store.cache().put_by_difficulty(Difficulty::Advanced, &[fast_castle()]).await;

        let result = store.get_by_difficulty(Difficulty::Advanced, None).await;
        assert_eq!(result.items, vec![fast_castle()]);
    }

    #[tokio::test]
    async fn test_absent_bucket_is_empty_not_error() {
        let store = store_with(vec![scout_rush()]).await;
        let result = store.get_by_type(BuildType::WaterMaps, None).await;
        assert!(result.items.is_empty());
        assert_eq!(result.total, 0);
    }

    #[tokio::test]
    async fn test_search_results_match_query() {
        let store = store_with(many(12)).await;
        let result = store.search("build 1", None).await;
        assert!(result.items.iter().all(|b| b.name.to_lowercase().contains("build 1")));
        assert_eq!(result.total, 2);

        assert_eq!(store.search("", None).await.total, 12);
    }

    #[tokio::test]
    async fn test_reads_fall_back_to_snapshot_when_cache_breaks() {
        let store = store_with(vec![scout_rush(), fast_castle()]).await;
        store
            .cache()
            .store()
            .conn
            .call(|conn| -> Result<(), tokio_rusqlite::rusqlite::Error> { conn.execute_batch("DROP TABLE cache") })
            .await
            .unwrap();

        let all = store.get_all(Some(Pagination::new(1, 1).unwrap())).await;
        assert_eq!(all, Page { items: vec![scout_rush()], total: 2 });
        assert_eq!(store.get_by_type(BuildType::FastCastle, None).await, Page { items: vec![fast_castle()], total: 1 });
        assert_eq!(store.search("scout", None).await, Page { items: vec![scout_rush()], total: 1 });
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_find_by_name_and_len() {
        let store = store_with(vec![scout_rush(), fast_castle()]).await;
        assert_eq!(store.len().await, 2);
        assert!(!store.is_empty().await);
        assert_eq!(store.find_by_name("fast castle a").await, Some(fast_castle()));
        assert!(store.find_by_name("Drush").await.is_none());
    }

    #[tokio::test]
    async fn test_restore_from_cache() {
        let cache = BuildCache::new(CacheStore::open_in_memory().await.unwrap());
        cache.put_all(&[scout_rush(), fast_castle()]).await;

        let store = IndexedBuildStore::new(cache);
        assert!(store.is_empty().await);
        assert_eq!(store.restore_from_cache().await, 2);
        assert_eq!(store.get_by_type(BuildType::FastCastle, None).await.items, vec![fast_castle()]);
    }

    #[tokio::test]
    async fn test_restore_without_cached_builds_keeps_store() {
        let cache = BuildCache::new(CacheStore::open_in_memory().await.unwrap());
        let store = IndexedBuildStore::new(cache);
        assert_eq!(store.restore_from_cache().await, 0);
        assert!(store.cache().store().entry(ALL_BUILDS_KEY).await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_concurrent_reads_during_refresh_see_whole_snapshots() {
        let store = Arc::new(store_with(many(10)).await);
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move { store.get_all(None).await.total }));
        }
        let writer = {
            let store = store.clone();
            tokio::spawn(async move { store.refresh(many(20)).await })
        };

        for handle in handles {
            let total = handle.await.unwrap();
            assert!(total == 10 || total == 20);
        }
        assert_eq!(writer.await.unwrap(), 20);
        assert_eq!(store.get_all(None).await.total, 20);
    }
}
