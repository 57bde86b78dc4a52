use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast};
use uuid::Uuid;

use super::error::StoreError;
use super::feed::{ChangeFeed, ChangeKind, SiteChange};
use super::models::{Site, SiteCheckUpdate};
use super::repository::SiteStore;

/// In-process site store. Writes are visible to the next read immediately.
#[derive(Default)]
pub struct MemoryStore {
    sites: RwLock<HashMap<Uuid, Site>>,
    feed: ChangeFeed,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted(mut sites: Vec<Site>) -> Vec<Site> {
    sites.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    sites
}

#[async_trait]
impl SiteStore for MemoryStore {
    async fn create(&self, site: &Site) -> Result<(), StoreError> {
        let mut sites = self.sites.write().await;
        if sites.contains_key(&site.id) {
            return Err(StoreError::Conflict(site.id));
        }
        sites.insert(site.id, site.clone());
        drop(sites);

        self.feed.publish(&site.owner_id, site.id, ChangeKind::Created);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Site>, StoreError> {
        Ok(self.sites.read().await.get(&id).cloned())
    }

    async fn apply_check(&self, id: Uuid, update: &SiteCheckUpdate) -> Result<Option<Site>, StoreError> {
        let mut sites = self.sites.write().await;
        let Some(site) = sites.get_mut(&id) else {
            return Ok(None);
        };
        site.apply(update);
        let merged = site.clone();
        drop(sites);

        self.feed.publish(&merged.owner_id, id, ChangeKind::Checked);
        Ok(Some(merged))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let removed = self.sites.write().await.remove(&id);
        match removed {
            Some(site) => {
                self.feed.publish(&site.owner_id, id, ChangeKind::Deleted);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Site>, StoreError> {
        let sites = self.sites.read().await;
        Ok(sorted(sites.values().filter(|site| site.is_owned_by(owner_id)).cloned().collect()))
    }

    async fn list_all(&self) -> Result<Vec<Site>, StoreError> {
        Ok(sorted(self.sites.read().await.values().cloned().collect()))
    }

    fn subscribe(&self) -> broadcast::Receiver<SiteChange> {
        self.feed.subscribe()
    }
}
