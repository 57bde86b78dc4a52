use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::monitoring::history::{self, Sample};
use crate::monitoring::types::{CheckOutcome, SiteStatus};
use crate::monitoring::uptime::{self, UptimeCounters};

/// Site model - a monitored endpoint owned by one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub id: Uuid,
    pub owner_id: String,
    pub url: String,
    pub status: SiteStatus,
    pub status_code: Option<u16>,
    pub latest_response_time_ms: u64,
    pub uptime_percent: f64,
    pub last_checked_at: DateTime<Utc>,
    pub last_downtime_at: Option<DateTime<Utc>>,
    pub history: Vec<Sample>,
    pub created_at: DateTime<Utc>,

    /// Internal aggregator state, persisted but not part of the public record
    #[serde(skip)]
    pub counters: UptimeCounters,
}

/// Check-derived fields of a site, written together as one update
#[derive(Debug, Clone, PartialEq)]
pub struct SiteCheckUpdate {
    pub status: SiteStatus,
    pub status_code: Option<u16>,
    pub latest_response_time_ms: u64,
    pub uptime_percent: f64,
    pub counters: UptimeCounters,
    pub last_checked_at: DateTime<Utc>,
    pub last_downtime_at: Option<DateTime<Utc>>,
    pub history: Vec<Sample>,
}

impl Site {
    /// Build a new site from its first check.
    pub fn from_first_check(
        owner_id: impl Into<String>,
        url: impl Into<String>,
        outcome: &CheckOutcome,
        history_len: usize,
    ) -> Self {
        let update = SiteCheckUpdate::fold(UptimeCounters::default(), None, &[], outcome, history_len);
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            url: url.into(),
            status: update.status,
            status_code: update.status_code,
            latest_response_time_ms: update.latest_response_time_ms,
            uptime_percent: update.uptime_percent,
            last_checked_at: update.last_checked_at,
            last_downtime_at: update.last_downtime_at,
            history: update.history,
            created_at: outcome.checked_at,
            counters: update.counters,
        }
    }

    /// Compute the update a new outcome produces, without touching `self`.
    pub fn fold_outcome(&self, outcome: &CheckOutcome, history_len: usize) -> SiteCheckUpdate {
        SiteCheckUpdate::fold(self.counters, self.last_downtime_at, &self.history, outcome, history_len)
    }

    pub fn apply(&mut self, update: &SiteCheckUpdate) {
        self.status = update.status;
        self.status_code = update.status_code;
        self.latest_response_time_ms = update.latest_response_time_ms;
        self.uptime_percent = update.uptime_percent;
        self.counters = update.counters;
        self.last_checked_at = update.last_checked_at;
        self.last_downtime_at = update.last_downtime_at;
        self.history = update.history.clone();
    }

    pub fn is_owned_by(&self, owner_id: &str) -> bool {
        self.owner_id == owner_id
    }
}

impl SiteCheckUpdate {
    fn fold(
        counters: UptimeCounters,
        last_downtime_at: Option<DateTime<Utc>>,
        prior_history: &[Sample],
        outcome: &CheckOutcome,
        history_len: usize,
    ) -> Self {
        let uptime = uptime::recompute(counters, outcome, last_downtime_at);
        Self {
            status: outcome.status,
            status_code: outcome.http_status_code,
            latest_response_time_ms: outcome.response_time_ms,
            uptime_percent: uptime.uptime_percent,
            counters: uptime.counters,
            last_checked_at: outcome.checked_at,
            last_downtime_at: uptime.last_downtime,
            history: history::append(prior_history, Sample::from(outcome), history_len),
        }
    }
}
