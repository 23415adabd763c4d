//! Key/value entry operations with TTL, access statistics and expiry sweep.
//!
//! The public operations never return errors: an I/O or serialization
//! failure is logged and reported as a miss (`get`), a failed write (`set`)
//! or zero affected rows. A broken cache is therefore indistinguishable
//! from a cold one for callers.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheStore;
use crate::Error;

/// A stored cache row, as seen by inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub value: Vec<u8>,
    pub created_at: String,
    /// `None` means the entry never expires.
    pub expires_at: Option<String>,
    pub access_count: i64,
    pub last_accessed: String,
}

/// Aggregate usage figures for the whole cache table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_entries: u64,
    pub active_entries: u64,
    pub avg_access_count: f64,
    pub last_accessed: Option<String>,
}

/// Fixed-width RFC 3339 so that string comparison in SQL is chronological.
pub(crate) fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// `None` or a zero TTL never expires; so does a TTL too large to represent.
fn expiry(now: DateTime<Utc>, ttl: Option<Duration>) -> Option<String> {
    let ttl = ttl.filter(|t| !t.is_zero())?;
    let delta = TimeDelta::from_std(ttl).ok()?;
    now.checked_add_signed(delta).map(timestamp)
}

impl CacheStore {
    /// Serialize `value` and upsert it under `key`.
    ///
    /// Overwriting resets the entry's statistics. Returns `false` when the
    /// value could not be written.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Option<Duration>) -> bool {
        let payload = match serde_json::to_vec(value) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(key, error = %e, "failed to serialize cache value");
                return false;
            }
        };

        match self.put_entry(key, payload, ttl).await {
            Ok(()) => {
                tracing::debug!(key, ttl_secs = ttl.map(|t| t.as_secs()), "cache set");
                true
            }
            Err(e) => {
                tracing::error!(key, error = %e, "failed to write cache entry");
                false
            }
        }
    }

    /// Fetch and deserialize a live entry.
    ///
    /// Missing, expired and undecodable entries all read as `None`. A hit
    /// bumps `access_count` and `last_accessed`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.read_entry(key).await {
            Ok(Some(payload)) => match serde_json::from_slice(&payload) {
                Ok(value) => {
                    tracing::debug!(key, "cache hit");
                    Some(value)
                }
                Err(e) => {
                    tracing::warn!(key, error = %e, "discarding undecodable cache entry");
                    None
                }
            },
            Ok(None) => {
                tracing::debug!(key, "cache miss");
                None
            }
            Err(e) => {
                tracing::error!(key, error = %e, "failed to read cache entry");
                None
            }
        }
    }

    /// Remove one entry. Returns whether anything was removed.
    pub async fn delete(&self, key: &str) -> bool {
        let owned = key.to_string();
        let result = self
            .conn
            .call(move |conn| -> Result<usize, Error> {
                Ok(conn.execute("DELETE FROM cache WHERE key = ?1", params![owned])?)
            })
            .await
            .map_err(Error::from);

        match result {
            Ok(n) => {
                if n > 0 {
                    tracing::debug!(key, "cache delete");
                }
                n > 0
            }
            Err(e) => {
                tracing::error!(key, error = %e, "failed to delete cache entry");
                false
            }
        }
    }

    /// Remove every entry whose key starts with `prefix`.
    ///
    /// The comparison is an exact prefix match; `%` and `_` are not wildcards.
    pub async fn delete_prefix(&self, prefix: &str) -> u64 {
        let owned = prefix.to_string();
        let result = self
            .conn
            .call(move |conn| -> Result<usize, Error> {
                Ok(conn.execute("DELETE FROM cache WHERE substr(key, 1, length(?1)) = ?1", params![owned])?)
            })
            .await
            .map_err(Error::from);

        match result {
            Ok(n) => {
                tracing::debug!(prefix, deleted = n, "cache prefix delete");
                n as u64
            }
            Err(e) => {
                tracing::error!(prefix, error = %e, "failed to delete cache prefix");
                0
            }
        }
    }

    /// Delete every entry whose expiry is at or before now.
    ///
    /// Returns the number of deleted entries.
    pub async fn sweep_expired(&self) -> u64 {
        let now = timestamp(Utc::now());
        let result = self
            .conn
            .call(move |conn| -> Result<usize, Error> {
                Ok(conn.execute(
                    "DELETE FROM cache WHERE expires_at IS NOT NULL AND expires_at <= ?1",
                    params![now],
                )?)
            })
            .await
            .map_err(Error::from);

        match result {
            Ok(n) => {
                tracing::info!(deleted = n, "swept expired cache entries");
                n as u64
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to sweep expired cache entries");
                0
            }
        }
    }

    /// Aggregate statistics. Returns zeroed stats when the query fails.
    pub async fn stats(&self) -> CacheStats {
        let now = timestamp(Utc::now());
        let result = self
            .conn
            .call(move |conn| -> Result<CacheStats, Error> {
                let stats = conn.query_row(
                    "SELECT
                        COUNT(*),
                        COUNT(CASE WHEN expires_at IS NULL OR expires_at > ?1 THEN 1 END),
                        COALESCE(AVG(access_count), 0.0),
                        MAX(last_accessed)
                     FROM cache",
                    params![now],
                    |row| {
                        Ok(CacheStats {
                            total_entries: row.get::<_, i64>(0)? as u64,
                            active_entries: row.get::<_, i64>(1)? as u64,
                            avg_access_count: row.get(2)?,
                            last_accessed: row.get(3)?,
                        })
                    },
                )?;
                Ok(stats)
            })
            .await
            .map_err(Error::from);

        result.unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to read cache stats");
            CacheStats::default()
        })
    }

    /// Inspect a row without touching its statistics, expired or not.
    pub async fn entry(&self, key: &str) -> Result<Option<CacheEntry>, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let result = conn.query_row(
                    "SELECT key, value, created_at, expires_at, access_count, last_accessed
                     FROM cache WHERE key = ?1",
                    params![key],
                    |row| {
                        Ok(CacheEntry {
                            key: row.get(0)?,
                            value: row.get(1)?,
                            created_at: row.get(2)?,
                            expires_at: row.get(3)?,
                            access_count: row.get(4)?,
                            last_accessed: row.get(5)?,
                        })
                    },
                );

                match result {
                    Ok(entry) => Ok(Some(entry)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn put_entry(&self, key: &str, payload: Vec<u8>, ttl: Option<Duration>) -> Result<(), Error> {
        let key = key.to_string();
        let now = Utc::now();
        let created_at = timestamp(now);
        let expires_at = expiry(now, ttl);

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO cache (key, value, created_at, expires_at, access_count, last_accessed)
                     VALUES (?1, ?2, ?3, ?4, 0, ?3)
                     ON CONFLICT(key) DO UPDATE SET
                        value = excluded.value,
                        created_at = excluded.created_at,
                        expires_at = excluded.expires_at,
                        access_count = 0,
                        last_accessed = excluded.last_accessed",
                    params![key, payload, created_at, expires_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn read_entry(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        let key = key.to_string();
        let now = timestamp(Utc::now());

        self.conn
            .call(move |conn| -> Result<Option<Vec<u8>>, Error> {
                let result = conn.query_row(
                    "SELECT value FROM cache WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
                    params![key, now],
                    |row| row.get::<_, Vec<u8>>(0),
                );

                let payload = match result {
                    Ok(payload) => payload,
                    Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                    Err(e) => return Err(e.into()),
                };

                // Statistics are best effort; the read still succeeds.
                if let Err(e) = conn.execute(
                    "UPDATE cache SET access_count = access_count + 1, last_accessed = ?2 WHERE key = ?1",
                    params![key, now],
                ) {
                    tracing::warn!(key = %key, error = %e, "failed to record cache access");
                }

                Ok(Some(payload))
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> CacheStore {
        CacheStore::open_in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let db = store().await;
        assert!(db.set("all-builds", &vec![1, 2, 3], Some(Duration::from_secs(60))).await);

        let value: Option<Vec<i32>> = db.get("all-builds").await;
        assert_eq!(value, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let db = store().await;
        let value: Option<String> = db.get("nonexistent").await;
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_reads_as_missing() {
        let db = store().await;
        db.set("short", "value", Some(Duration::from_secs(1))).await;
        assert_eq!(db.get::<String>("short").await.as_deref(), Some("value"));

        tokio::time::sleep(tokio::time::Duration::from_secs(2)).await;

        assert!(db.get::<String>("short").await.is_none());
        // Still present until swept.
        assert!(db.entry("short").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_zero_or_absent_ttl_never_expires() {
        let db = store().await;
        db.set("forever", &1, None).await;
        db.set("also-forever", &2, Some(Duration::ZERO)).await;

        assert!(db.entry("forever").await.unwrap().unwrap().expires_at.is_none());
        assert!(db.entry("also-forever").await.unwrap().unwrap().expires_at.is_none());
    }

    #[tokio::test]
    async fn test_get_bumps_access_statistics() {
        let db = store().await;
        db.set("counted", &"x", None).await;
        let before = db.entry("counted").await.unwrap().unwrap();
        assert_eq!(before.access_count, 0);

        let _: Option<String> = db.get("counted").await;
        let _: Option<String> = db.get("counted").await;

        let after = db.entry("counted").await.unwrap().unwrap();
        assert_eq!(after.access_count, 2);
        assert!(after.last_accessed >= before.last_accessed);
    }

    #[tokio::test]
    async fn test_overwrite_last_writer_wins() {
        let db = store().await;
        db.set("k", &"old", None).await;
        let _: Option<String> = db.get("k").await;
        db.set("k", &"new", None).await;

        assert_eq!(db.get::<String>("k").await.as_deref(), Some("new"));
        assert_eq!(db.entry("k").await.unwrap().unwrap().access_count, 1);
    }

    #[tokio::test]
    async fn test_undecodable_value_is_a_miss() {
        let db = store().await;
        db.set("k", &"text", None).await;
        let value: Option<Vec<u32>> = db.get("k").await;
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let db = store().await;
        db.set("k", &1, None).await;
        assert!(db.delete("k").await);
        assert!(!db.delete("k").await);
        assert!(db.get::<i32>("k").await.is_none());
    }

    #[tokio::test]
    async fn test_delete_prefix_is_exact() {
        let db = store().await;
        db.set("builds-by-type:feudal_rush", &1, None).await;
        db.set("builds-by-type:fast_castle", &2, None).await;
        db.set("builds-by-typeXfast", &3, None).await;
        db.set("all-builds", &4, None).await;

        assert_eq!(db.delete_prefix("builds-by-type:").await, 2);
        assert!(db.get::<i32>("builds-by-typeXfast").await.is_some());
        assert!(db.get::<i32>("all-builds").await.is_some());
    }

    #[tokio::test]
    async fn test_sweep_expired() {
        let db = store().await;
        db.set("expiring", &1, Some(Duration::from_secs(1))).await;
        db.set("fresh", &2, Some(Duration::from_secs(3600))).await;
        db.set("forever", &3, None).await;

        tokio::time::sleep(tokio::time::Duration::from_secs(2)).await;

        assert_eq!(db.sweep_expired().await, 1);
        assert!(db.entry("expiring").await.unwrap().is_none());
        assert!(db.get::<i32>("fresh").await.is_some());
        assert!(db.get::<i32>("forever").await.is_some());
    }

    #[tokio::test]
    async fn test_stats() {
        let db = store().await;
        let empty = db.stats().await;
        assert_eq!(empty.total_entries, 0);
        assert_eq!(empty.avg_access_count, 0.0);
        assert!(empty.last_accessed.is_none());

        db.set("a", &1, None).await;
        db.set("b", &2, None).await;
        let _: Option<i32> = db.get("a").await;
        let _: Option<i32> = db.get("a").await;

        let stats = db.stats().await;
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.active_entries, 2);
        assert_eq!(stats.avg_access_count, 1.0);
        assert!(stats.last_accessed.is_some());
    }

    #[tokio::test]
    async fn test_broken_table_degrades_to_misses() {
        let db = store().await;
        db.set("all-builds", &vec![1, 2], None).await;
        db.conn
            .call(|conn| -> Result<(), tokio_rusqlite::rusqlite::Error> { conn.execute_batch("DROP TABLE cache") })
            .await
            .unwrap();

        assert!(!db.set("all-builds", &vec![3], None).await);
        assert!(db.get::<Vec<i32>>("all-builds").await.is_none());
        assert!(!db.delete("all-builds").await);
        assert_eq!(db.delete_prefix("builds:").await, 0);
        assert_eq!(db.sweep_expired().await, 0);
        assert_eq!(db.stats().await, CacheStats::default());
        assert!(db.entry("all-builds").await.is_err());
    }

    #[test]
    fn test_timestamps_sort_lexically() {
        let early = Utc::now();
        let later = early + TimeDelta::milliseconds(1500);
        assert!(timestamp(early) < timestamp(later));
        assert_eq!(timestamp(early).len(), timestamp(later).len());
    }
}
