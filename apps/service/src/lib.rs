//! SitePulse service - website health checks and uptime tracking
//!
//! Sites are probed over HTTP on registration, on demand and on a periodic
//! sweep. Each check updates the site's status, a bounded latency history
//! and its running uptime percentage.

pub mod bootstrap;
pub mod config;
pub mod database;
pub mod monitoring;
pub mod pool;
pub mod registry;
pub mod validation;

pub use bootstrap::{BootstrapError, build_registry};
pub use config::Config;
pub use database::{Site, SiteStore, StoreError};
pub use monitoring::{CheckOutcome, HttpProber, MonitoringScheduler, Prober, SiteStatus};
pub use registry::{RegistryError, RegistrySettings, SiteRegistry, SweepSummary};
pub use validation::ValidationError;
