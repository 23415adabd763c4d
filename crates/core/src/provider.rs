//! Source of build records.

use async_trait::async_trait;

use crate::Error;
use crate::model::BuildRecord;

/// Supplies a complete build collection.
///
/// Implementations enforce their own timeouts. An error or an empty result
/// means "no new data"; callers keep whatever they already have.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    async fn fetch_builds(&self) -> Result<Vec<BuildRecord>, Error>;
}
