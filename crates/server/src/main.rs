//! buildguide server entry point.
//!
//! Loads configuration, opens the cache, loads the build catalog and serves
//! the HTTP API until ctrl-c. Logs go to stderr as JSON.

use std::sync::Arc;

use anyhow::Result;
use buildguide_client::GuideScraper;
use buildguide_core::{AppConfig, BuildCache, BuildService, CacheStore, IndexedBuildStore, StepCatalog};
use buildguide_server::app::{AppState, build_router};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(bind_addr = %config.bind_addr, db_path = %config.db_path.display(), "starting buildguide");

    let store = CacheStore::open(&config.db_path).await?;
    let cache = BuildCache::with_ttls(store.clone(), config.listing_ttl(), config.search_ttl());
    let repository = Arc::new(IndexedBuildStore::new(cache));
    let provider = Arc::new(GuideScraper::from_config(&config)?);
    let service = Arc::new(BuildService::new(repository, provider, StepCatalog::builtin(), store.clone()));

    let builds = service.load_initial().await;
    let swept = store.sweep_expired().await;
    tracing::info!(builds, swept, "build catalog loaded");

    let app = build_router(AppState::new(service, &config));
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "buildguide listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("buildguide stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
