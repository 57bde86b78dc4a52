//! Site registry: runs checks for monitored sites and persists the results.
//!
//! Every operation that touches a site's check state holds that site's lease
//! from before the load until after the write, so concurrent refreshes of
//! the same site apply one after the other and no history sample or uptime
//! count is lost.

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ProbeConfig;
use crate::database::{Site, SiteStore, StoreError};
use crate::monitoring::history::DEFAULT_HISTORY_LEN;
use crate::monitoring::prober::Prober;
use crate::monitoring::types::CheckOutcome;
use crate::validation::{TargetPolicy, ValidationError, validate_site_url};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Site {0} belongs to another owner")]
    Forbidden(Uuid),

    #[error("Site {0} not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Probe parameters applied to every check the registry runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrySettings {
    pub timeout_ms: u64,
    pub history_len: usize,
    pub policy: TargetPolicy,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self { timeout_ms: 10_000, history_len: DEFAULT_HISTORY_LEN, policy: TargetPolicy::default() }
    }
}

impl From<&ProbeConfig> for RegistrySettings {
    fn from(config: &ProbeConfig) -> Self {
        Self {
            timeout_ms: config.timeout_ms,
            history_len: config.history_len,
            policy: config.target_policy(),
        }
    }
}

/// Totals of one sweep over all sites
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub checked: usize,
    pub up: usize,
    pub down: usize,
    /// Deleted between listing and checking
    pub skipped: usize,
    pub failed: usize,
}

pub struct SiteRegistry {
    store: Arc<dyn SiteStore>,
    prober: Arc<dyn Prober>,
    settings: RegistrySettings,
    leases: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

fn require_identity(identity: &str) -> Result<&str, RegistryError> {
    if identity.trim().is_empty() {
        return Err(RegistryError::Unauthenticated);
    }
    Ok(identity)
}

impl SiteRegistry {
    pub fn new(store: Arc<dyn SiteStore>, prober: Arc<dyn Prober>, settings: RegistrySettings) -> Self {
        Self { store, prober, settings, leases: Mutex::new(HashMap::new()) }
    }

    /// Register a URL for `owner_id` and run its first check.
    ///
    /// An unreachable site is still registered, with status `Down`.
    pub async fn register_site(&self, owner_id: &str, url: &str) -> Result<Site, RegistryError> {
        let owner_id = require_identity(owner_id)?;
        validate_site_url(url, self.settings.policy)?;
        let url = url.trim();

        let outcome = self.prober.probe(url, self.settings.timeout_ms).await?;
        let site = Site::from_first_check(owner_id, url, &outcome, self.settings.history_len);
        self.store.create(&site).await?;

        info!(site_id = %site.id, owner_id, url, status = %site.status, "Registered site");
        Ok(site)
    }

    /// Probe a URL once with the registry's settings. Nothing is stored.
    pub async fn probe_url(&self, url: &str) -> Result<CheckOutcome, RegistryError> {
        validate_site_url(url, self.settings.policy)?;
        Ok(self.prober.probe(url.trim(), self.settings.timeout_ms).await?)
    }

    /// Re-check a site on behalf of its owner.
    pub async fn refresh_site(&self, site_id: Uuid, requester_id: &str) -> Result<Site, RegistryError> {
        let requester_id = require_identity(requester_id)?;
        let _lease = self.lease(site_id).await;

        let site = match self.load_owned(site_id, requester_id).await {
            Ok(site) => site,
            Err(e) => return Err(self.forget_if_missing(site_id, e).await),
        };
        self.run_check(site).await
    }

    /// Re-check a site without an owner check. For trusted triggers such as the scheduler.
    pub async fn check_site(&self, site_id: Uuid) -> Result<Site, RegistryError> {
        let _lease = self.lease(site_id).await;

        let site = match self.store.get(site_id).await? {
            Some(site) => site,
            None => return Err(self.forget_if_missing(site_id, RegistryError::NotFound(site_id)).await),
        };
        self.run_check(site).await
    }

    /// Delete a site. Removal is immediate and unconditional.
    pub async fn delete_site(&self, site_id: Uuid, requester_id: &str) -> Result<(), RegistryError> {
        let requester_id = require_identity(requester_id)?;
        let _lease = self.lease(site_id).await;

        if let Err(e) = self.load_owned(site_id, requester_id).await {
            return Err(self.forget_if_missing(site_id, e).await);
        }
        self.store.delete(site_id).await?;
        self.release(site_id).await;

        info!(%site_id, owner_id = requester_id, "Deleted site");
        Ok(())
    }

    pub async fn get_site(&self, site_id: Uuid, requester_id: &str) -> Result<Site, RegistryError> {
        let requester_id = require_identity(requester_id)?;
        self.load_owned(site_id, requester_id).await
    }

    pub async fn list_sites(&self, owner_id: &str) -> Result<Vec<Site>, RegistryError> {
        let owner_id = require_identity(owner_id)?;
        Ok(self.store.list_by_owner(owner_id).await?)
    }

    /// Check every stored site, at most `concurrency` at a time.
    ///
    /// Per-site failures are logged and counted; only failing to list the
    /// sites fails the sweep.
    pub async fn check_all(&self, concurrency: usize) -> Result<SweepSummary, RegistryError> {
        let site_ids: Vec<Uuid> = self.store.list_all().await?.into_iter().map(|site| site.id).collect();
        debug!(sites = site_ids.len(), concurrency, "Starting sweep");

        let summary = stream::iter(site_ids)
            .map(|site_id| async move { (site_id, self.check_site(site_id).await) })
            .buffer_unordered(concurrency.max(1))
            .fold(SweepSummary::default(), |mut summary, (site_id, result)| async move {
                match result {
                    Ok(site) => {
                        summary.checked += 1;
                        if site.status.is_up() {
                            summary.up += 1;
                        } else {
                            summary.down += 1;
                        }
                    }
                    Err(RegistryError::NotFound(_)) => summary.skipped += 1,
                    Err(e) => {
                        warn!(%site_id, error = %e, "Scheduled check failed");
                        summary.failed += 1;
                    }
                }
                summary
            })
            .await;

        info!(
            checked = summary.checked,
            up = summary.up,
            down = summary.down,
            skipped = summary.skipped,
            failed = summary.failed,
            "Sweep finished"
        );
        Ok(summary)
    }

    /// Stream of full snapshots of `owner_id`'s sites: one immediately, then
    /// one after each committed change to any of them.
    pub fn watch_owner(
        &self,
        owner_id: &str,
    ) -> Result<BoxStream<'static, Result<Vec<Site>, StoreError>>, RegistryError> {
        let owner_id = require_identity(owner_id)?.to_string();
        let store = Arc::clone(&self.store);
        // Subscribe before the first snapshot so no change falls in between
        let changes = store.subscribe();

        let snapshots = stream::unfold(
            (store, changes, owner_id, true),
            |(store, mut changes, owner_id, initial)| async move {
                if !initial {
                    loop {
                        match changes.recv().await {
                            Ok(change) if change.owner_id == owner_id => break,
                            Ok(_) => continue,
                            Err(RecvError::Lagged(skipped)) => {
                                debug!(skipped, "Change feed lagged, resending snapshot");
                                break;
                            }
                            Err(RecvError::Closed) => return None,
                        }
                    }
                }

                let snapshot = store.list_by_owner(&owner_id).await;
                Some((snapshot, (store, changes, owner_id, false)))
            },
        );

        Ok(snapshots.boxed())
    }

    async fn load_owned(&self, site_id: Uuid, requester_id: &str) -> Result<Site, RegistryError> {
        let site = self.store.get(site_id).await?.ok_or(RegistryError::NotFound(site_id))?;
        if !site.is_owned_by(requester_id) {
            return Err(RegistryError::Forbidden(site_id));
        }
        Ok(site)
    }

    async fn run_check(&self, site: Site) -> Result<Site, RegistryError> {
        let outcome = self.prober.probe(&site.url, self.settings.timeout_ms).await?;
        let update = site.fold_outcome(&outcome, self.settings.history_len);

        let merged = self
            .store
            .apply_check(site.id, &update)
            .await?
            .ok_or(RegistryError::NotFound(site.id))?;

        debug!(
            site_id = %merged.id,
            status = %merged.status,
            response_time_ms = merged.latest_response_time_ms,
            uptime_percent = merged.uptime_percent,
            "Site checked"
        );
        Ok(merged)
    }

    async fn lease(&self, site_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut leases = self.leases.lock().await;
            Arc::clone(leases.entry(site_id).or_default())
        };
        lock.lock_owned().await
    }

    async fn release(&self, site_id: Uuid) {
        self.leases.lock().await.remove(&site_id);
    }

    /// Drop the lease entry of a site that does not exist, passing the error through.
    async fn forget_if_missing(&self, site_id: Uuid, error: RegistryError) -> RegistryError {
        if matches!(error, RegistryError::NotFound(_)) {
            self.release(site_id).await;
        }
        error
    }
}
