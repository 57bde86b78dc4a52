use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Classified state of a site after a check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SiteStatus {
    Up,
    Down,
}

impl SiteStatus {
    pub fn is_up(self) -> bool {
        matches!(self, SiteStatus::Up)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SiteStatus::Up => "Up",
            SiteStatus::Down => "Down",
        }
    }
}

impl std::fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SiteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Up" | "up" => Ok(SiteStatus::Up),
            "Down" | "down" => Ok(SiteStatus::Down),
            other => Err(format!("unknown site status: {other}")),
        }
    }
}

/// Result of a single probe
///
/// `checked_at` is kept at millisecond precision, the resolution stores persist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutcome {
    /// Up or Down
    pub status: SiteStatus,

    /// HTTP status code, absent when no response was received
    pub http_status_code: Option<u16>,

    /// Dispatch to response headers, 0 when no response was received
    pub response_time_ms: u64,

    /// When the check completed
    pub checked_at: DateTime<Utc>,

    /// Short reason when the target could not be reached
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckOutcome {
    /// A response was received; classify it by status code.
    pub fn responded(status_code: u16, response_time_ms: u64, checked_at: DateTime<Utc>) -> Self {
        // 2xx and 3xx count as reachable
        let status = if (200..400).contains(&status_code) { SiteStatus::Up } else { SiteStatus::Down };
        Self {
            status,
            http_status_code: Some(status_code),
            response_time_ms,
            checked_at: checked_at.trunc_subsecs(3),
            error: None,
        }
    }

    /// No response within the deadline (connect, DNS, TLS failure or timeout).
    pub fn unreachable(error: impl Into<String>, checked_at: DateTime<Utc>) -> Self {
        Self {
            status: SiteStatus::Down,
            http_status_code: None,
            response_time_ms: 0,
            checked_at: checked_at.trunc_subsecs(3),
            error: Some(error.into()),
        }
    }

    pub fn is_up(&self) -> bool {
        self.status.is_up()
    }
}
