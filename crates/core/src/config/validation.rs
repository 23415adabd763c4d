//! Range checks applied after every layer has been merged.

use crate::config::AppConfig;
use std::net::SocketAddr;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `bind_addr` is not a socket address
    /// - `source_url` is not an http(s) URL
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `request_timeout_ms` is less than 50ms or not below `timeout_ms`
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `max_concurrent_requests` is outside 1..=32
    /// - either TTL is 0
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_addr.parse::<SocketAddr>().is_err() {
            return Err(invalid("bind_addr", "must be a socket address such as 0.0.0.0:8000"));
        }

        if !(self.source_url.starts_with("http://") || self.source_url.starts_with("https://")) {
            return Err(invalid("source_url", "must be an http or https URL"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }
        if self.request_timeout_ms < 50 {
            return Err(invalid("request_timeout_ms", "must be at least 50ms"));
        }
        if self.request_timeout_ms >= self.timeout_ms {
            return Err(invalid("request_timeout_ms", "must be shorter than timeout_ms"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.max_concurrent_requests == 0 || self.max_concurrent_requests > 32 {
            return Err(invalid("max_concurrent_requests", "must be between 1 and 32"));
        }

        if self.listing_ttl_secs == 0 {
            return Err(invalid("listing_ttl_secs", "must be greater than 0"));
        }
        if self.search_ttl_secs == 0 {
            return Err(invalid("search_ttl_secs", "must be greater than 0"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.cors_origins.is_empty() {
            tracing::warn!("cors_origins is empty; cross-origin requests will be rejected");
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}
