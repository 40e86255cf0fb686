//! Storage implementations for UniPath.
//!
//! Both backends implement `unipath_core::CounselStore`; [`open`] picks one
//! from a connection string.

pub mod in_memory;
pub mod seed;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use in_memory::InMemoryStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

use std::sync::Arc;
use unipath_core::error::StoreError;
use unipath_core::store::CounselStore;

/// Open the store named by `url`.
///
/// `memory` selects [`InMemoryStore`]; anything else is handed to SQLite.
pub async fn open(url: &str) -> Result<Arc<dyn CounselStore>, StoreError> {
    if url == "memory" {
        return Ok(Arc::new(InMemoryStore::new()));
    }

    #[cfg(feature = "sqlite")]
    {
        Ok(Arc::new(SqliteStore::new(url).await?))
    }

    #[cfg(not(feature = "sqlite"))]
    {
        Err(StoreError::Connection(format!(
            "unsupported store URL '{url}' (built without the sqlite feature)"
        )))
    }
}
