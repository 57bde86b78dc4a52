use thiserror::Error;
use uuid::Uuid;

/// Failure reported by a site store. Never retried by the registry.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database query failed: {0}")]
    Query(#[from] libsql::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] deadpool::managed::PoolError<libsql::Error>),

    #[error("Failed to build connection pool: {0}")]
    PoolBuild(#[from] deadpool::managed::BuildError),

    #[error("History encoding failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Stored record {id} is corrupt: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("Site {0} already exists")]
    Conflict(Uuid),
}
