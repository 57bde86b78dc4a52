use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Row, params};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use super::error::StoreError;
use super::feed::{ChangeFeed, ChangeKind, SiteChange};
use super::migrations::run_migrations;
use super::models::{Site, SiteCheckUpdate};
use crate::monitoring::history::Sample;
use crate::monitoring::types::SiteStatus;
use crate::monitoring::uptime::UptimeCounters;
use crate::pool::{LibsqlManager, LibsqlPool};

/// Persistence collaborator for site records
#[async_trait]
pub trait SiteStore: Send + Sync {
    /// Insert a new site
    async fn create(&self, site: &Site) -> Result<(), StoreError>;

    /// Point read by id
    async fn get(&self, id: Uuid) -> Result<Option<Site>, StoreError>;

    /// Merge check-derived fields into a site in one write.
    /// Returns the merged record, or `None` when the site no longer exists.
    async fn apply_check(&self, id: Uuid, update: &SiteCheckUpdate) -> Result<Option<Site>, StoreError>;

    /// Remove a site. Returns whether it existed.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;

    /// All sites of one owner, oldest first
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Site>, StoreError>;

    /// Every site, oldest first
    async fn list_all(&self) -> Result<Vec<Site>, StoreError>;

    /// Change notifications for committed writes
    fn subscribe(&self) -> broadcast::Receiver<SiteChange>;
}

const SITE_COLUMNS: &str = "id, owner_id, url, status, status_code, latest_response_time_ms, \
     uptime_percent, total_checks, up_checks, last_checked_at, last_downtime_at, history, created_at";

/// LibSQL site store
pub struct LibsqlStore {
    pool: LibsqlPool,
    feed: ChangeFeed,
}

impl LibsqlStore {
    /// Open (or create) a local database file and bring its schema up to date
    pub async fn open(path: &str, pool_size: usize) -> Result<Self, StoreError> {
        let database = libsql::Builder::new_local(path).build().await?;
        let pool = LibsqlPool::builder(LibsqlManager::new(database)).max_size(pool_size.max(1)).build()?;

        let store = Self::new_from_pool(pool);
        let conn = store.pool.get().await?;
        run_migrations(&conn).await?;

        Ok(store)
    }

    /// Create a store from an already migrated pool
    pub fn new_from_pool(pool: LibsqlPool) -> Self {
        Self { pool, feed: ChangeFeed::default() }
    }

    async fn fetch(&self, conn: &libsql::Connection, id: Uuid) -> Result<Option<Site>, StoreError> {
        let mut rows = conn
            .query(&format!("SELECT {SITE_COLUMNS} FROM sites WHERE id = ?"), params![id.to_string()])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row_to_site(&row)?)),
            None => Ok(None),
        }
    }

    async fn fetch_many(&self, sql: &str, params: impl libsql::params::IntoParams) -> Result<Vec<Site>, StoreError> {
        let conn = self.pool.get().await?;
        let mut rows = conn.query(sql, params).await?;
        let mut sites = Vec::new();

        while let Some(row) = rows.next().await? {
            sites.push(row_to_site(&row)?);
        }

        Ok(sites)
    }
}

#[async_trait]
impl SiteStore for LibsqlStore {
    async fn create(&self, site: &Site) -> Result<(), StoreError> {
        let conn = self.pool.get().await?;
        let history = serde_json::to_string(&site.history)?;

        let inserted = conn
            .execute(
                "INSERT INTO sites (id, owner_id, url, status, status_code, latest_response_time_ms, \
                 uptime_percent, total_checks, up_checks, last_checked_at, last_downtime_at, history, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) ON CONFLICT(id) DO NOTHING",
                params![
                    site.id.to_string(),
                    site.owner_id.clone(),
                    site.url.clone(),
                    site.status.as_str(),
                    site.status_code.map(i64::from),
                    site.latest_response_time_ms as i64,
                    site.uptime_percent,
                    site.counters.total_checks as i64,
                    site.counters.up_checks as i64,
                    site.last_checked_at.timestamp_millis(),
                    site.last_downtime_at.map(|t| t.timestamp_millis()),
                    history,
                    site.created_at.timestamp_millis()
                ],
            )
            .await?;

        if inserted == 0 {
            return Err(StoreError::Conflict(site.id));
        }

        debug!(site_id = %site.id, owner_id = %site.owner_id, "Stored new site");
        self.feed.publish(&site.owner_id, site.id, ChangeKind::Created);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Site>, StoreError> {
        let conn = self.pool.get().await?;
        self.fetch(&conn, id).await
    }

    async fn apply_check(&self, id: Uuid, update: &SiteCheckUpdate) -> Result<Option<Site>, StoreError> {
        let conn = self.pool.get().await?;
        let history = serde_json::to_string(&update.history)?;

        // Single statement: readers see either the old or the new record
        let updated = conn
            .execute(
                "UPDATE sites SET status = ?, status_code = ?, latest_response_time_ms = ?, uptime_percent = ?, \
                 total_checks = ?, up_checks = ?, last_checked_at = ?, last_downtime_at = ?, history = ? \
                 WHERE id = ?",
                params![
                    update.status.as_str(),
                    update.status_code.map(i64::from),
                    update.latest_response_time_ms as i64,
                    update.uptime_percent,
                    update.counters.total_checks as i64,
                    update.counters.up_checks as i64,
                    update.last_checked_at.timestamp_millis(),
                    update.last_downtime_at.map(|t| t.timestamp_millis()),
                    history,
                    id.to_string()
                ],
            )
            .await?;

        if updated == 0 {
            return Ok(None);
        }

        let site = self.fetch(&conn, id).await?;
        if let Some(site) = &site {
            self.feed.publish(&site.owner_id, id, ChangeKind::Checked);
        }
        Ok(site)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let conn = self.pool.get().await?;
        let mut rows = conn
            .query("DELETE FROM sites WHERE id = ? RETURNING owner_id", params![id.to_string()])
            .await?;

        match rows.next().await? {
            Some(row) => {
                let owner_id: String = row.get(0)?;
                self.feed.publish(&owner_id, id, ChangeKind::Deleted);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Site>, StoreError> {
        self.fetch_many(
            &format!("SELECT {SITE_COLUMNS} FROM sites WHERE owner_id = ? ORDER BY created_at, id"),
            params![owner_id.to_string()],
        )
        .await
    }

    async fn list_all(&self) -> Result<Vec<Site>, StoreError> {
        self.fetch_many(&format!("SELECT {SITE_COLUMNS} FROM sites ORDER BY created_at, id"), ()).await
    }

    fn subscribe(&self) -> broadcast::Receiver<SiteChange> {
        self.feed.subscribe()
    }
}

fn row_to_site(row: &Row) -> Result<Site, StoreError> {
    let id_str: String = row.get(0)?;
    let corrupt = |reason: String| StoreError::Corrupt { id: id_str.clone(), reason };

    let id = Uuid::parse_str(&id_str).map_err(|e| corrupt(e.to_string()))?;
    let status: SiteStatus = row.get::<String>(3)?.parse().map_err(corrupt)?;
    let status_code = row
        .get::<Option<i64>>(4)?
        .map(|code| u16::try_from(code).map_err(|_| corrupt(format!("status code {code} out of range"))))
        .transpose()?;
    let history: Vec<Sample> = serde_json::from_str(&row.get::<String>(11)?)?;

    let timestamp = |millis: i64| {
        DateTime::<Utc>::from_timestamp_millis(millis)
            .ok_or_else(|| corrupt(format!("timestamp {millis} out of range")))
    };

    Ok(Site {
        id,
        owner_id: row.get(1)?,
        url: row.get(2)?,
        status,
        status_code,
        latest_response_time_ms: row.get::<i64>(5)?.max(0) as u64,
        uptime_percent: row.get(6)?,
        counters: UptimeCounters {
            total_checks: row.get::<i64>(7)?.max(0) as u64,
            up_checks: row.get::<i64>(8)?.max(0) as u64,
        },
        last_checked_at: timestamp(row.get(9)?)?,
        last_downtime_at: row.get::<Option<i64>>(10)?.map(timestamp).transpose()?,
        history,
        created_at: timestamp(row.get(12)?)?,
    })
}
