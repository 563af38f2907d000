use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Storage format for instants. Fixed width and UTC, so string comparison
/// in SQL orders the same way as the instants themselves.
pub const DB_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

pub fn to_db(dt: &DateTime<Utc>) -> String {
    dt.format(DB_FORMAT).to_string()
}

pub fn from_db(s: &str) -> anyhow::Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(s, DB_FORMAT)
        .map_err(|e| anyhow::anyhow!("invalid stored timestamp {s:?}: {e}"))?;
    Ok(Utc.from_utc_datetime(&naive))
}

/// Parses a datetime supplied by a caller. Accepts RFC 3339 with any offset,
/// or a bare `YYYY-MM-DDTHH:MM[:SS]` taken as UTC. Truncated to the whole
/// minute, so every stored interval lasts a whole number of minutes.
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    let parsed = DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|naive| Utc.from_utc_datetime(&naive))
        })?;
    let secs = parsed.timestamp();
    Utc.timestamp_opt(secs - secs.rem_euclid(60), 0).single()
}

/// Which end of a range a bare date stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeBound {
    Start,
    End,
}

/// Like [`parse_datetime`], but also accepts a bare `YYYY-MM-DD`. As a start
/// bound it means midnight of that day; as an end bound it covers the whole
/// day (midnight of the next day).
pub fn parse_range_bound(s: &str, bound: RangeBound) -> Option<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d") {
        let date = match bound {
            RangeBound::Start => date,
            RangeBound::End => date.succ_opt()?,
        };
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    parse_datetime(s)
}

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    /// Returns `None` unless `start < end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    pub fn starting_at(start: DateTime<Utc>, minutes: i64) -> Option<Self> {
        Self::new(start, start + Duration::minutes(minutes))
    }

    /// Touching endpoints do not count.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, other: &Interval) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// Anything that occupies a span of time on a provider's calendar.
pub trait Timed {
    fn interval(&self) -> Interval;
}

impl Timed for Interval {
    fn interval(&self) -> Interval {
        *self
    }
}
