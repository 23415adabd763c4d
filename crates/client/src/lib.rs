//! Client code for buildguide.
//!
//! This crate provides the HTTP fetch pipeline and the guide-site scraper
//! that feeds the build store.

pub mod fetch;
pub mod scrape;

#[cfg(test)]
mod test_server;

pub use fetch::{FetchClient, FetchConfig, FetchResponse};
pub use scrape::{GuideScraper, ScrapeConfig};
