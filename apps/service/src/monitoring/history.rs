//! Bounded latency history kept per site for trend display.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::CheckOutcome;

/// Number of samples kept per site unless configured otherwise
pub const DEFAULT_HISTORY_LEN: usize = 50;

/// One latency sample, stored as `{ time, value }`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub time: DateTime<Utc>,
    pub value: u64,
}

impl Sample {
    pub fn new(time: DateTime<Utc>, value: u64) -> Self {
        Self { time, value }
    }
}

impl From<&CheckOutcome> for Sample {
    fn from(outcome: &CheckOutcome) -> Self {
        Self::new(outcome.checked_at, outcome.response_time_ms)
    }
}

/// Append `sample` and keep only the `max_len` most recent entries.
///
/// The input slice is left untouched; callers get a fresh vector so readers
/// of the previous history never see a half-applied change.
pub fn append(history: &[Sample], sample: Sample, max_len: usize) -> Vec<Sample> {
    if max_len == 0 {
        return Vec::new();
    }

    // Keep max_len - 1 of the old entries, then the new one
    let keep = (max_len - 1).min(history.len());
    let mut next = Vec::with_capacity(keep + 1);
    next.extend_from_slice(&history[history.len() - keep..]);
    next.push(sample);
    next
}
