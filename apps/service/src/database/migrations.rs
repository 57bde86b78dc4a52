use libsql::Connection;
use tracing::info;

use super::error::StoreError;

/// Schema version - increment when making schema changes
const SCHEMA_VERSION: i32 = 1;

/// Run database migrations
pub async fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    // Tracks applied migrations
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL,
            description TEXT
        )",
        (),
    )
    .await?;

    let current_version = get_current_version(conn).await?;

    if current_version >= SCHEMA_VERSION {
        info!(version = current_version, "Database schema is up to date");
        return Ok(());
    }

    info!(from = current_version, to = SCHEMA_VERSION, "Running migrations");

    if current_version < 1 {
        run_migration_v1(conn).await?;
        record_migration(conn, 1, "Sites table").await?;
    }

    Ok(())
}

async fn get_current_version(conn: &Connection) -> Result<i32, StoreError> {
    let mut rows = conn.query("SELECT MAX(version) FROM schema_migrations", ()).await?;

    match rows.next().await? {
        Some(row) => Ok(row.get::<Option<i32>>(0)?.unwrap_or(0)),
        None => Ok(0),
    }
}

async fn record_migration(conn: &Connection, version: i32, description: &str) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO schema_migrations (version, applied_at, description) VALUES (?, ?, ?)",
        libsql::params![version, chrono::Utc::now().timestamp(), description],
    )
    .await?;

    info!("Applied migration v{}: {}", version, description);
    Ok(())
}

/// Migration v1: one row per site, history kept inline as JSON
async fn run_migration_v1(conn: &Connection) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS sites (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            url TEXT NOT NULL,
            status TEXT NOT NULL,
            status_code INTEGER,
            latest_response_time_ms INTEGER NOT NULL,
            uptime_percent REAL NOT NULL,
            total_checks INTEGER NOT NULL DEFAULT 0,
            up_checks INTEGER NOT NULL DEFAULT 0,
            last_checked_at INTEGER NOT NULL,
            last_downtime_at INTEGER,
            history TEXT NOT NULL DEFAULT '[]',
            created_at INTEGER NOT NULL
        )",
        (),
    )
    .await?;

    conn.execute("CREATE INDEX IF NOT EXISTS idx_sites_owner ON sites(owner_id, created_at)", ())
        .await?;

    Ok(())
}
