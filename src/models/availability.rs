use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::interval::{Interval, Timed};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityWindow {
    pub id: String,
    pub provider_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Timed for AvailabilityWindow {
    fn interval(&self) -> Interval {
        Interval {
            start: self.start,
            end: self.end,
        }
    }
}

/// A free sub-interval of an availability window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_minutes: i64,
}

impl From<Interval> for Slot {
    fn from(interval: Interval) -> Self {
        Slot {
            start: interval.start,
            end: interval.end,
            duration_minutes: interval.duration_minutes(),
        }
    }
}
