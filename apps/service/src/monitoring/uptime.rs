//! Running availability per site.
//!
//! Uptime is a lifetime average: every check counts once, whatever triggered
//! it. The capped latency history plays no part in this computation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::CheckOutcome;

/// Check counters persisted alongside a site
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UptimeCounters {
    pub total_checks: u64,
    pub up_checks: u64,
}

impl UptimeCounters {
    /// Percentage of checks classified Up, in [0, 100]. No checks counts as fully up.
    pub fn percent(&self) -> f64 {
        if self.total_checks == 0 {
            return 100.0;
        }
        let up = self.up_checks.min(self.total_checks) as f64;
        (100.0 * up / self.total_checks as f64).clamp(0.0, 100.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UptimeUpdate {
    pub counters: UptimeCounters,
    pub uptime_percent: f64,
    pub last_downtime: Option<DateTime<Utc>>,
}

/// Fold one outcome into the running counters and the last-downtime marker.
pub fn recompute(
    prior: UptimeCounters,
    outcome: &CheckOutcome,
    prior_downtime: Option<DateTime<Utc>>,
) -> UptimeUpdate {
    let counters = UptimeCounters {
        total_checks: prior.total_checks.saturating_add(1),
        up_checks: prior.up_checks.saturating_add(u64::from(outcome.is_up())),
    };

    let last_downtime = if outcome.is_up() {
        prior_downtime
    } else {
        // never move the marker backwards
        Some(prior_downtime.map_or(outcome.checked_at, |prior| prior.max(outcome.checked_at)))
    };

    UptimeUpdate { counters, uptime_percent: counters.percent(), last_downtime }
}
