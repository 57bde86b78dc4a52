use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Checked,
    Deleted,
}

/// Notification that one site changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteChange {
    pub owner_id: String,
    pub site_id: Uuid,
    pub kind: ChangeKind,
}

/// Broadcast of site changes, published by stores after each committed write
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<SiteChange>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SiteChange> {
        self.tx.subscribe()
    }

    pub fn publish(&self, owner_id: &str, site_id: Uuid, kind: ChangeKind) {
        // No subscribers is fine
        let _ = self.tx.send(SiteChange { owner_id: owner_id.to_string(), site_id, kind });
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(256)
    }
}
