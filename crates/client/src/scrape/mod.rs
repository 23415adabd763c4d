//! Build catalog scraper for the guide index site.
//!
//! One request for the index page, then detail pages fetched concurrently
//! under a semaphore. The whole run shares one deadline: the index page must
//! arrive before it, and detail pages still pending when it passes leave
//! their listings as parsed from the index.

pub mod parse;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{Instant, timeout_at};
use url::Url;

use buildguide_core::{AppConfig, BuildRecord, BuildStep, CatalogProvider, Error};

use crate::fetch::{FetchClient, FetchConfig, canonicalize};
pub use parse::{AgeTimes, Listing, parse_detail, parse_index};

/// Scraper settings.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// Guide index page.
    pub source_url: String,
    /// Upper bound on in-flight detail fetches.
    pub max_concurrent_requests: usize,
    /// Bound on the whole scrape, detail pages included.
    pub timeout: Duration,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ScrapeConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            source_url: config.source_url.clone(),
            max_concurrent_requests: config.max_concurrent_requests,
            timeout: config.timeout(),
        }
    }
}

/// [`CatalogProvider`] that scrapes the configured guide site.
#[derive(Debug, Clone)]
pub struct GuideScraper {
    fetch: FetchClient,
    config: ScrapeConfig,
}

impl GuideScraper {
    pub fn new(fetch: FetchClient, config: ScrapeConfig) -> Self {
        Self { fetch, config }
    }

    /// Build the fetch client and scraper from application config.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let fetch = FetchClient::new(FetchConfig::from(config))?;
        Ok(Self::new(fetch, ScrapeConfig::from(config)))
    }

    async fn scrape(&self, deadline: Instant) -> Result<Vec<BuildRecord>, Error> {
        let base = canonicalize(&self.config.source_url)
            .map_err(|e| Error::Provider(format!("invalid source url: {e}")))?;

        let index = timeout_at(deadline, self.fetch.fetch(&base)).await.map_err(|_| {
            Error::FetchTimeout(format!("no index page within {}ms", self.config.timeout.as_millis()))
        })??;
        let listings = parse_index(&index.text(), &index.final_url);
        if listings.is_empty() {
            return Err(Error::Provider(format!("no builds found at {base}")));
        }

        Ok(self.enrich_all(listings, deadline).await)
    }

    /// Fetch every listing's detail page, at most `max_concurrent_requests`
    /// at a time, and return records in index order.
    async fn enrich_all(&self, listings: Vec<Listing>, deadline: Instant) -> Vec<BuildRecord> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_requests.max(1)));
        let mut join_set = JoinSet::new();
        let mut records: Vec<BuildRecord> = Vec::with_capacity(listings.len());

        for (pos, listing) in listings.into_iter().enumerate() {
            if let Some(url) = listing.detail_url {
                let semaphore = semaphore.clone();
                let fetch = self.fetch.clone();
                join_set.spawn(async move {
                    let detail = timeout_at(deadline, async {
                        let _permit = semaphore.acquire_owned().await.ok()?;
                        fetch_detail(&fetch, &url).await
                    })
                    .await;
                    match detail {
                        Ok(detail) => (pos, detail),
                        Err(_) => {
                            tracing::warn!(url = %url, "scrape deadline passed before detail page");
                            (pos, None)
                        }
                    }
                });
            }
            records.push(listing.record);
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((pos, Some((steps, times)))) => {
                    if let Some(record) = records.get_mut(pos) {
                        apply_detail(record, steps, times);
                    }
                }
                Ok((_, None)) => {}
                Err(e) => tracing::warn!(error = %e, "detail task failed"),
            }
        }

        records
    }
}

/// Steps and age times from a detail page; `None` when it cannot be fetched.
async fn fetch_detail(fetch: &FetchClient, url: &Url) -> Option<(Vec<BuildStep>, AgeTimes)> {
    match fetch.fetch(url).await {
        Ok(page) => Some(parse_detail(&page.text())),
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "detail fetch failed");
            None
        }
    }
}

/// Fill steps and missing age times; the index page's values win.
fn apply_detail(record: &mut BuildRecord, steps: Vec<BuildStep>, times: AgeTimes) {
    if !steps.is_empty() {
        record.steps = Some(steps);
    }
    record.feudal_age_time = record.feudal_age_time.or(times.feudal);
    record.castle_age_time = record.castle_age_time.or(times.castle);
    record.imperial_age_time = record.imperial_age_time.or(times.imperial);
}

#[async_trait]
impl CatalogProvider for GuideScraper {
    async fn fetch_builds(&self) -> Result<Vec<BuildRecord>, Error> {
        let started = Instant::now();
        let result = self.scrape(started + self.config.timeout).await;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(builds) => tracing::info!(count = builds.len(), elapsed_ms, "scrape completed"),
            Err(e) => tracing::error!(error = %e, elapsed_ms, "scrape failed"),
        }
        result
    }
}
