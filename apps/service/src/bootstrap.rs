use std::sync::Arc;

use thiserror::Error;

use crate::config::Config;
use crate::database::{StoreError, open_store};
use crate::monitoring::HttpProber;
use crate::registry::{RegistrySettings, SiteRegistry};

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Failed to open site store: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Build the HTTP prober described by the configuration
pub fn build_prober(config: &Config) -> Result<HttpProber, BootstrapError> {
    Ok(HttpProber::new(&config.probe.user_agent, config.probe.target_policy())?)
}

/// Wire store, prober and settings into a registry
pub async fn build_registry(config: &Config) -> Result<Arc<SiteRegistry>, BootstrapError> {
    let store = open_store(&config.database).await?;
    let prober = Arc::new(build_prober(config)?);

    Ok(Arc::new(SiteRegistry::new(store, prober, RegistrySettings::from(&config.probe))))
}
