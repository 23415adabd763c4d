//! Query service: the operations the HTTP layer calls.
//!
//! Wraps a [`BuildRepository`] with step enrichment, guide assembly and the
//! refresh workflow against a [`CatalogProvider`].

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::Error;
use crate::cache::{CacheStats, CacheStore};
use crate::model::{BuildFilters, BuildRecord, BuildStep, BuildType, Difficulty, Page, Pagination};
use crate::provider::CatalogProvider;
use crate::repository::BuildRepository;
use crate::steps::StepCatalog;

/// Most alternatives listed next to the main build of a guide.
pub const MAX_ALTERNATIVES: usize = 5;

/// One build as presented inside a guide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuideEntry {
    pub name: String,
    pub difficulty: Difficulty,
    pub description: String,
    pub steps: Vec<BuildStep>,
}

/// Step-by-step guide for a build type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildGuide {
    pub build_type: BuildType,
    pub main_build: GuideEntry,
    pub alternative_builds: Vec<GuideEntry>,
    pub total_available: usize,
}

/// Result of a refresh attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshOutcome {
    /// Collection size after the attempt.
    pub total: usize,
    /// Whether the provider delivered a new collection.
    pub replaced: bool,
    pub expired_cleared: u64,
}

pub struct BuildService {
    repository: Arc<dyn BuildRepository>,
    provider: Arc<dyn CatalogProvider>,
    steps: StepCatalog,
    cache: CacheStore,
    refresh_lock: Mutex<()>,
}

impl BuildService {
    pub fn new(
        repository: Arc<dyn BuildRepository>, provider: Arc<dyn CatalogProvider>, steps: StepCatalog,
        cache: CacheStore,
    ) -> Self {
        Self { repository, provider, steps, cache, refresh_lock: Mutex::new(()) }
    }

    pub async fn list_all(&self, pagination: Pagination) -> Page<BuildRecord> {
        self.repository.get_all(Some(pagination)).await
    }

    /// Builds of one type, with missing steps filled from the catalog.
    pub async fn list_by_type(&self, build_type: BuildType, pagination: Option<Pagination>) -> Page<BuildRecord> {
        let mut page = self.repository.get_by_type(build_type, pagination).await;
        for build in &mut page.items {
            self.enrich(build);
        }
        page
    }

    pub async fn list_by_difficulty(&self, difficulty: Difficulty, pagination: Pagination) -> Page<BuildRecord> {
        self.repository.get_by_difficulty(difficulty, Some(pagination)).await
    }

    pub async fn search(&self, query: &str, pagination: Pagination) -> Page<BuildRecord> {
        self.repository.search(query, Some(pagination)).await
    }

    pub async fn filtered(&self, filters: &BuildFilters, pagination: Pagination) -> Page<BuildRecord> {
        self.repository.get_filtered(filters, Some(pagination)).await
    }

    /// Guide for `build_type`: the first build plus up to five alternatives.
    ///
    /// # Errors
    ///
    /// `Error::NotFound` when no build has this type.
    pub async fn guide(&self, build_type: BuildType) -> Result<BuildGuide, Error> {
        let page = self.list_by_type(build_type, None).await;
        let total_available = page.total;
        let mut entries = page.items.into_iter().map(|build| GuideEntry {
            name: build.name,
            difficulty: build.difficulty,
            description: build.description,
            steps: build.steps.unwrap_or_default(),
        });

        let main_build = entries
            .next()
            .ok_or_else(|| Error::NotFound(format!("no builds found for type {build_type}")))?;

        Ok(BuildGuide {
            build_type,
            main_build,
            alternative_builds: entries.take(MAX_ALTERNATIVES).collect(),
            total_available,
        })
    }

    pub fn build_types(&self) -> Vec<BuildType> {
        BuildType::ALL.to_vec()
    }

    pub fn difficulties(&self) -> Vec<Difficulty> {
        Difficulty::ALL.to_vec()
    }

    pub async fn build_count(&self) -> usize {
        self.repository.len().await
    }

    pub async fn find_by_name(&self, name: &str) -> Option<BuildRecord> {
        let mut build = self.repository.find_by_name(name).await?;
        self.enrich(&mut build);
        Some(build)
    }

    /// Fetch from the provider and replace the collection when it returns
    /// data, then sweep expired cache entries.
    ///
    /// Provider failures are logged, never returned; the previous collection
    /// stays in place.
    pub async fn refresh(&self) -> RefreshOutcome {
        let _guard = self.refresh_lock.lock().await;
        let started = Instant::now();

        let replaced = match self.fetch().await {
            Some(builds) => {
                self.repository.refresh(builds).await;
                true
            }
            None => false,
        };

        let expired_cleared = self.cache.sweep_expired().await;
        let total = self.repository.len().await;

        tracing::info!(
            total,
            replaced,
            expired_cleared,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "refresh finished"
        );
        RefreshOutcome { total, replaced, expired_cleared }
    }

    /// Startup load: provider first, persisted listing as fallback.
    ///
    /// Returns the number of builds served afterwards.
    pub async fn load_initial(&self) -> usize {
        let _guard = self.refresh_lock.lock().await;

        match self.fetch().await {
            Some(builds) => self.repository.refresh(builds).await,
            None => self.repository.restore_from_cache().await,
        }
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    async fn fetch(&self) -> Option<Vec<BuildRecord>> {
        match self.provider.fetch_builds().await {
            Ok(builds) if builds.is_empty() => {
                tracing::warn!("provider returned no builds; keeping current collection");
                None
            }
            Ok(builds) => {
                tracing::info!(count = builds.len(), "provider returned builds");
                Some(builds)
            }
            Err(e) => {
                tracing::warn!(error = %e, "provider failed; keeping current collection");
                None
            }
        }
    }

    fn enrich(&self, build: &mut BuildRecord) {
        if build.steps.as_ref().is_none_or(Vec::is_empty) {
            build.steps = Some(self.steps.steps_for(&build.name, build.build_type));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::cache::BuildCache;
    use crate::repository::IndexedBuildStore;

    /// Serves a queue of canned responses, then errors.
    struct ScriptedProvider {
        responses: std::sync::Mutex<Vec<Result<Vec<BuildRecord>, Error>>>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(mut responses: Vec<Result<Vec<BuildRecord>, Error>>) -> Arc<Self> {
            responses.reverse();
            Arc::new(Self { responses: std::sync::Mutex::new(responses), calls: AtomicUsize::new(0) })
        }
    }

    #[async_trait]
    impl CatalogProvider for ScriptedProvider {
        async fn fetch_builds(&self) -> Result<Vec<BuildRecord>, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(Error::Provider("no more responses".into())))
        }
    }

    fn feudal(name: &str) -> BuildRecord {
        BuildRecord::new(name, BuildType::FeudalRush, Difficulty::Intermediate)
    }

    fn catalog() -> Vec<BuildRecord> {
        vec![
            feudal("Scout Rush"),
            feudal("Archer Rush"),
            feudal("Men at Arms"),
            feudal("Skirmisher Rush"),
            feudal("Spear Rush"),
            feudal("Trush"),
            feudal("Maa Archers"),
            BuildRecord::new("Fast Castle A", BuildType::FastCastle, Difficulty::Beginner),
        ]
    }

    async fn service_with(provider: Arc<ScriptedProvider>) -> (BuildService, CacheStore) {
        let store = CacheStore::open_in_memory().await.unwrap();
        let repository = Arc::new(IndexedBuildStore::new(BuildCache::new(store.clone())));
        let service = BuildService::new(repository, provider, StepCatalog::builtin(), store.clone());
        (service, store)
    }

    #[tokio::test]
    async fn test_load_initial_from_provider() {
        let (service, _) = service_with(ScriptedProvider::new(vec![Ok(catalog())])).await;
        assert_eq!(service.load_initial().await, 8);
        assert_eq!(service.list_all(Pagination::default()).await.total, 8);
    }

    #[tokio::test]
    async fn test_load_initial_falls_back_to_cache() {
        let store = CacheStore::open_in_memory().await.unwrap();
        BuildCache::new(store.clone()).put_all(&catalog()).await;

        let repository = Arc::new(IndexedBuildStore::new(BuildCache::new(store.clone())));
        let provider = ScriptedProvider::new(vec![Err(Error::FetchTimeout("slow".into()))]);
        let service = BuildService::new(repository, provider, StepCatalog::builtin(), store);

        assert_eq!(service.load_initial().await, 8);
    }

    #[tokio::test]
    async fn test_list_by_type_enriches_steps() {
        let (service, _) = service_with(ScriptedProvider::new(vec![Ok(catalog())])).await;
        service.load_initial().await;

        let page = service.list_by_type(BuildType::FeudalRush, Some(Pagination::default())).await;
        assert_eq!(page.total, 7);
        let scout = &page.items[0];
        assert_eq!(scout.steps.as_ref().map(Vec::len), Some(8));
        let generic = &page.items[2];
        assert_eq!(generic.steps.as_ref().map(Vec::len), Some(6));
    }

    #[tokio::test]
    async fn test_existing_steps_are_kept() {
        let own = BuildStep {
            step_number: 1,
            age: "Dark Age".into(),
            time: None,
            action: "Custom".into(),
            details: String::new(),
            resources_needed: None,
        };
        let build = BuildRecord { steps: Some(vec![own.clone()]), ..feudal("Scout Rush") };
        let (service, _) = service_with(ScriptedProvider::new(vec![Ok(vec![build])])).await;
        service.load_initial().await;

        let page = service.list_by_type(BuildType::FeudalRush, None).await;
        assert_eq!(page.items[0].steps, Some(vec![own]));
    }

    #[tokio::test]
    async fn test_guide_main_and_alternatives() {
        let (service, _) = service_with(ScriptedProvider::new(vec![Ok(catalog())])).await;
        service.load_initial().await;

        let guide = service.guide(BuildType::FeudalRush).await.unwrap();
        assert_eq!(guide.main_build.name, "Scout Rush");
        assert_eq!(guide.alternative_builds.len(), MAX_ALTERNATIVES);
        assert_eq!(guide.alternative_builds[0].name, "Archer Rush");
        assert_eq!(guide.total_available, 7);
        assert!(guide.alternative_builds.iter().all(|b| !b.steps.is_empty()));
    }

    #[tokio::test]
    async fn test_guide_for_empty_type_is_not_found() {
        let (service, _) = service_with(ScriptedProvider::new(vec![Ok(catalog())])).await;
        service.load_initial().await;

        let result = service.guide(BuildType::WaterMaps).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_refresh_keeps_data_on_failure_or_empty() {
        let provider = ScriptedProvider::new(vec![Ok(catalog()), Ok(Vec::new()), Err(Error::Provider("down".into()))]);
        let (service, _) = service_with(provider.clone()).await;
        service.load_initial().await;

        let empty = service.refresh().await;
        assert!(!empty.replaced);
        assert_eq!(empty.total, 8);

        let failed = service.refresh().await;
        assert!(!failed.replaced);
        assert_eq!(failed.total, 8);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_refresh_replaces_collection() {
        let provider = ScriptedProvider::new(vec![Ok(catalog()), Ok(vec![feudal("Scout Rush")])]);
        let (service, store) = service_with(provider).await;
        service.load_initial().await;

        let outcome = service.refresh().await;
        assert!(outcome.replaced);
        assert_eq!(outcome.total, 1);
        assert_eq!(service.search("castle", Pagination::default()).await.total, 0);
        assert!(store.stats().await.total_entries >= 1);
    }

    #[tokio::test]
    async fn test_find_by_name_enriches() {
        let (service, _) = service_with(ScriptedProvider::new(vec![Ok(catalog())])).await;
        service.load_initial().await;

        let build = service.find_by_name("archer rush").await.unwrap();
        assert_eq!(build.steps.map(|s| s.len()), Some(8));
        assert!(service.find_by_name("nope").await.is_none());
    }

    #[test]
    fn test_guide_serializes_with_wire_names() {
        let guide = BuildGuide {
            build_type: BuildType::FastCastle,
            main_build: GuideEntry {
                name: "Fast Castle A".into(),
                difficulty: Difficulty::Beginner,
                description: String::new(),
                steps: Vec::new(),
            },
            alternative_builds: Vec::new(),
            total_available: 1,
        };
        let json = serde_json::to_value(&guide).unwrap();
        assert_eq!(json["build_type"], "fast_castle");
        assert_eq!(json["main_build"]["difficulty"], "beginner");
    }
}
