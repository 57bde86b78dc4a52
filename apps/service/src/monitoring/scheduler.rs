use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{error, info};

use crate::config::SchedulerConfig;
use crate::registry::{SiteRegistry, SweepSummary};

const MIN_INTERVAL: u64 = 10; // 10 seconds
const MAX_INTERVAL: u64 = 86400; // 24 hours

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Check interval must be between {MIN_INTERVAL} and {MAX_INTERVAL} seconds, got {0}")]
pub struct IntervalError(pub u64);

/// Validate check interval
pub fn validate_interval(interval_seconds: u64) -> Result<Duration, IntervalError> {
    if !(MIN_INTERVAL..=MAX_INTERVAL).contains(&interval_seconds) {
        return Err(IntervalError(interval_seconds));
    }
    Ok(Duration::from_secs(interval_seconds))
}

/// Monitoring scheduler - periodically re-checks every registered site
///
/// Each tick runs one sweep through the registry. Nothing is retried: a site
/// that fails now is simply checked again on the next tick.
pub struct MonitoringScheduler {
    registry: Arc<SiteRegistry>,
    period: Duration,
    concurrency: usize,
}

impl MonitoringScheduler {
    pub fn new(registry: Arc<SiteRegistry>, config: &SchedulerConfig) -> Result<Self, IntervalError> {
        Ok(Self {
            registry,
            period: validate_interval(config.interval_seconds)?,
            concurrency: config.concurrency.max(1),
        })
    }

    /// Run a single sweep now
    pub async fn sweep(&self) -> Option<SweepSummary> {
        match self.registry.check_all(self.concurrency).await {
            Ok(summary) => Some(summary),
            Err(e) => {
                error!("Failed to list sites for sweep: {}", e);
                None
            }
        }
    }

    /// Spawn the periodic loop. The first sweep runs one period from now.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(period_secs = self.period.as_secs(), concurrency = self.concurrency, "Scheduler started");

            let mut timer = interval_at(Instant::now() + self.period, self.period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                timer.tick().await;
                self.sweep().await;
            }
        })
    }
}
