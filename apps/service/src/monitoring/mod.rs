/// Monitoring engine module - probes sites and folds the outcomes
///
/// This module is responsible for:
/// - Probing a URL with a bounded HTTP request
/// - Keeping the bounded latency history
/// - Computing running uptime
/// - Scheduling periodic sweeps
pub mod history;
pub mod prober;
pub mod scheduler;
pub mod types;
pub mod uptime;

pub use prober::{HttpProber, Prober};
pub use scheduler::MonitoringScheduler;
pub use types::{CheckOutcome, SiteStatus};
