//! Cache schema versioning.
//!
//! The applied version lives in SQLite's `user_version` header field, so the
//! cache file carries no bookkeeping table of its own.

use tokio_rusqlite::Connection;

use super::Error;

/// Schema steps in ascending version order.
const MIGRATIONS: &[(u32, &str)] = &[(1, include_str!("../../migrations/001_cache.sql"))];

/// Latest schema version this build knows about.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |(version, _)| *version)
}

/// Bring the schema up to [`latest_version`]. Each step commits on its own;
/// a failing step leaves earlier ones applied.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        let current: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
        if current > latest_version() {
            return Err(Error::MigrationFailed(format!(
                "cache schema version {current} is newer than supported version {}",
                latest_version()
            )));
        }

        for &(version, sql) in MIGRATIONS.iter().filter(|(version, _)| *version > current) {
            let tx = conn.transaction()?;
            tx.execute_batch(sql)
                .map_err(|e| Error::MigrationFailed(format!("version {version}: {e}")))?;
            tx.pragma_update(None, "user_version", version)?;
            tx.commit()?;
            tracing::debug!(version, "applied cache migration");
        }
        Ok(())
    })
    .await
    .map_err(Error::from)
}
