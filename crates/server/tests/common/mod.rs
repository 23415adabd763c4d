use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use buildguide_core::{
    AppConfig, BuildCache, BuildRecord, BuildService, BuildType, CacheStore, CatalogProvider, Difficulty, Error,
    IndexedBuildStore, StepCatalog,
};
use buildguide_server::app::{AppState, build_router};

pub type App = axum::routing::RouterIntoService<Body, ()>;

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

/// Provider returning a fixed collection.
pub struct FixedProvider(pub Vec<BuildRecord>);

#[async_trait]
impl CatalogProvider for FixedProvider {
    async fn fetch_builds(&self) -> Result<Vec<BuildRecord>, Error> {
        Ok(self.0.clone())
    }
}

pub fn sample_builds() -> Vec<BuildRecord> {
    vec![
        BuildRecord {
            feudal_age_time: Some(10),
            ..BuildRecord::new("Scout Rush", BuildType::FeudalRush, Difficulty::Intermediate)
                .with_description("Fast scouts to harass the enemy economy")
        },
        BuildRecord {
            feudal_age_time: Some(11),
            ..BuildRecord::new("Archer Rush", BuildType::FeudalRush, Difficulty::Beginner)
                .with_description("Mass archers in Feudal Age")
        },
        BuildRecord {
            feudal_age_time: Some(16),
            castle_age_time: Some(19),
            ..BuildRecord::new("FC Knights", BuildType::FastCastle, Difficulty::Advanced)
                .with_description("Fast Castle into knights")
        },
        BuildRecord::new("Drush FC", BuildType::DarkAgeRush, Difficulty::Advanced)
            .with_description("Militia harass, then Fast Castle"),
    ]
}

/// Router over an in-memory cache, loaded from `builds`.
pub async fn app_with(builds: Vec<BuildRecord>) -> App {
    let store = CacheStore::open_in_memory().await.expect("cache");
    let repository = Arc::new(IndexedBuildStore::new(BuildCache::new(store.clone())));
    let provider = Arc::new(FixedProvider(builds));
    let service = Arc::new(BuildService::new(repository, provider, StepCatalog::builtin(), store));
    service.load_initial().await;

    let state = AppState::new(service, &AppConfig::default());
    build_router(state).into_service()
}

pub async fn app() -> App {
    app_with(sample_builds()).await
}
