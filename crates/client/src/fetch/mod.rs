//! Page fetching for the scraper.
//!
//! Requests follow a bounded number of redirects and accept compressed
//! bodies. Bodies are read chunk by chunk and abandoned as soon as they pass
//! `max_bytes`, so an oversized page never lands in memory whole.

pub mod url;

use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use reqwest::{Client, Response, Url, header};

pub use url::{UrlError, canonicalize, resolve_link};

use buildguide_core::{AppConfig, Error};

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8";

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    /// Largest body accepted, in bytes.
    pub max_bytes: usize,
    /// Per-request timeout, connect through last body byte.
    pub timeout: Duration,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.request_timeout(),
            max_redirects: 5,
        }
    }
}

/// A successful page fetch.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// Where the request ended up after redirects. Relative links resolve
    /// against this.
    pub final_url: Url,
    pub bytes: Bytes,
}

impl FetchResponse {
    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Shared HTTP client. Cloning is cheap and reuses the connection pool.
#[derive(Debug, Clone)]
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::HttpError(format!("cannot build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// GET `url`. Non-2xx statuses and bodies over `max_bytes` are errors.
    pub async fn fetch(&self, url: &Url) -> Result<FetchResponse, Error> {
        let started = Instant::now();

        let response = self
            .http
            .get(url.clone())
            .header(header::ACCEPT, ACCEPT_HTML)
            .send()
            .await
            .map_err(|e| transport_error(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpError(format!("{url} answered {}", status.as_u16())));
        }
        if let Some(declared) = response.content_length()
            && declared > self.config.max_bytes as u64
        {
            return Err(self.too_large(url, declared as usize));
        }

        let final_url = response.url().clone();
        let bytes = self.read_capped(url, response).await?;

        tracing::debug!(
            url = %url,
            final_url = %final_url,
            status = status.as_u16(),
            bytes = bytes.len(),
            fetch_ms = started.elapsed().as_millis() as u64,
            "fetched page"
        );
        Ok(FetchResponse { final_url, bytes })
    }

    async fn read_capped(&self, url: &Url, mut response: Response) -> Result<Bytes, Error> {
        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| transport_error(url, &e))? {
            if body.len() + chunk.len() > self.config.max_bytes {
                return Err(self.too_large(url, body.len() + chunk.len()));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body.freeze())
    }

    fn too_large(&self, url: &Url, seen: usize) -> Error {
        Error::FetchTooLarge(format!("{url}: {seen} bytes exceeds limit of {}", self.config.max_bytes))
    }
}

fn transport_error(url: &Url, err: &reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::FetchTimeout(format!("{url}: {err}"))
    } else {
        Error::HttpError(format!("{url}: {err}"))
    }
}
