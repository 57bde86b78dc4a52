/// Site persistence
///
/// A `SiteStore` is the only shared mutable resource of the service. Two
/// backends are provided: an in-process map and LibSQL (SQLite).
pub mod error;
pub mod feed;
pub mod memory;
pub mod migrations;
pub mod models;
pub mod repository;

use std::sync::Arc;

pub use error::StoreError;
pub use feed::{ChangeFeed, ChangeKind, SiteChange};
pub use memory::MemoryStore;
pub use models::{Site, SiteCheckUpdate};
pub use repository::{LibsqlStore, SiteStore};

use crate::config::{DatabaseBackend, DatabaseConfig};

/// Build the store selected by configuration
pub async fn open_store(config: &DatabaseConfig) -> Result<Arc<dyn SiteStore>, StoreError> {
    match config.backend {
        DatabaseBackend::Memory => {
            tracing::info!("Using in-memory site store");
            Ok(Arc::new(MemoryStore::new()))
        }
        DatabaseBackend::Libsql => {
            tracing::info!(path = %config.path, "Opening LibSQL site store");
            Ok(Arc::new(LibsqlStore::open(&config.path, config.pool_size).await?))
        }
    }
}
