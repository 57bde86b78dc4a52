use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sitepulse_service::database::MemoryStore;
use sitepulse_service::validation::{TargetPolicy, validate_site_url};
use sitepulse_service::{CheckOutcome, Prober, RegistrySettings, SiteRegistry, ValidationError};

/// Prober answering from the URL alone: hosts starting with `down.` are
/// unreachable, `error.` answers 500, everything else answers 200 in 42 ms.
pub struct FakeProber;

#[async_trait]
impl Prober for FakeProber {
    async fn probe(&self, url: &str, _timeout_ms: u64) -> Result<CheckOutcome, ValidationError> {
        let url = validate_site_url(url, TargetPolicy::default())?;
        let host = url.host_str().unwrap_or_default();

        Ok(if host.starts_with("down.") {
            CheckOutcome::unreachable("connection refused", Utc::now())
        } else if host.starts_with("error.") {
            CheckOutcome::responded(500, 17, Utc::now())
        } else {
            CheckOutcome::responded(200, 42, Utc::now())
        })
    }
}

pub fn registry() -> Arc<SiteRegistry> {
    Arc::new(SiteRegistry::new(Arc::new(MemoryStore::new()), Arc::new(FakeProber), RegistrySettings::default()))
}
