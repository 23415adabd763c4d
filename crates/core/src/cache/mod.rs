//! SQLite-backed TTL cache for build query results.
//!
//! [`CacheStore`] holds JSON values under string keys with an optional
//! expiry; expired rows read as misses until [`CacheStore::sweep_expired`]
//! deletes them. [`BuildCache`] layers the listing key scheme on top.

pub mod builds;
pub mod connection;
pub mod hash;
pub mod migrations;
pub mod store;

pub use crate::Error;

pub use builds::BuildCache;
pub use connection::CacheStore;
pub use store::{CacheEntry, CacheStats};
