//! Service configuration: bind address, scrape source and limits, cache TTLs
//! and HTTP response policy.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (BUILDGUIDE_*)
/// 2. TOML config file (if BUILDGUIDE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite cache database.
    ///
    /// Set via BUILDGUIDE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Socket address the HTTP server binds to.
    ///
    /// Set via BUILDGUIDE_BIND_ADDR environment variable.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Build-guide index page the scraper reads.
    ///
    /// Set via BUILDGUIDE_SOURCE_URL environment variable.
    #[serde(default = "default_source_url")]
    pub source_url: String,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via BUILDGUIDE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Overall scrape timeout in milliseconds.
    ///
    /// Set via BUILDGUIDE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Timeout for a single page request in milliseconds. Must be shorter
    /// than `timeout_ms`.
    ///
    /// Set via BUILDGUIDE_REQUEST_TIMEOUT_MS environment variable.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Maximum bytes to fetch per page.
    ///
    /// Set via BUILDGUIDE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Upper bound on concurrent detail-page fetches.
    ///
    /// Set via BUILDGUIDE_MAX_CONCURRENT_REQUESTS environment variable.
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    /// TTL for cached listings (all, by type, by difficulty).
    #[serde(default = "default_listing_ttl_secs")]
    pub listing_ttl_secs: u64,

    /// TTL for cached search results.
    #[serde(default = "default_search_ttl_secs")]
    pub search_ttl_secs: u64,

    /// Allowed CORS origins. `*` allows any origin.
    ///
    /// Set via BUILDGUIDE_CORS_ORIGINS as an array, e.g. `["https://a.example"]`.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// `max-age` advertised in the Cache-Control header of successful GETs.
    #[serde(default = "default_http_cache_max_age_secs")]
    pub http_cache_max_age_secs: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./buildguide-cache.sqlite")
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".into()
}

fn default_source_url() -> String {
    "https://aoecompanion.com/build-guides".into()
}

fn default_user_agent() -> String {
    "buildguide/0.1".into()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_max_concurrent_requests() -> usize {
    5
}

fn default_listing_ttl_secs() -> u64 {
    3600
}

fn default_search_ttl_secs() -> u64 {
    1800
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

fn default_http_cache_max_age_secs() -> u64 {
    3600
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            bind_addr: default_bind_addr(),
            source_url: default_source_url(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            max_bytes: default_max_bytes(),
            max_concurrent_requests: default_max_concurrent_requests(),
            listing_ttl_secs: default_listing_ttl_secs(),
            search_ttl_secs: default_search_ttl_secs(),
            cors_origins: default_cors_origins(),
            http_cache_max_age_secs: default_http_cache_max_age_secs(),
        }
    }
}

impl AppConfig {
    /// Budget for a whole scrape.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn listing_ttl(&self) -> Duration {
        Duration::from_secs(self.listing_ttl_secs)
    }

    pub fn search_ttl(&self) -> Duration {
        Duration::from_secs(self.search_ttl_secs)
    }

    /// Load and validate. A file that fails to parse, an unparsable
    /// environment value or a failed [`AppConfig::validate`] is an error.
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment()
            .extract()
            .map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("BUILDGUIDE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment.merge(
            Env::prefixed("BUILDGUIDE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        )
    }
}
