use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::interval::{Interval, Timed};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub client_id: String,
    pub provider_id: String,
    pub service_id: String,
    pub variation_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub price_cents: i64,
    pub status: BookingStatus,
    pub cancellation_reason: Option<String>,
    pub cancelled_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn is_participant(&self, user_id: &str) -> bool {
        self.client_id == user_id || self.provider_id == user_id
    }
}

impl Timed for Booking {
    fn interval(&self) -> Interval {
        Interval {
            start: self.start,
            end: self.end,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Approved,
    Cancelled,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("booking cannot move from {} to {}", .from.as_str(), .to.as_str())]
pub struct IllegalTransition {
    pub from: BookingStatus,
    pub to: BookingStatus,
}

impl BookingStatus {
    pub const ACTIVE: [BookingStatus; 2] = [BookingStatus::Pending, BookingStatus::Approved];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Approved => "APPROVED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Completed => "COMPLETED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Some(BookingStatus::Pending),
            "APPROVED" => Some(BookingStatus::Approved),
            "CANCELLED" => Some(BookingStatus::Cancelled),
            "COMPLETED" => Some(BookingStatus::Completed),
            _ => None,
        }
    }

    /// Active bookings hold their time and block overlapping requests.
    pub fn is_active(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Approved)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// The only gate through which a booking's status may change.
    pub fn transition(self, to: BookingStatus) -> Result<BookingStatus, IllegalTransition> {
        use BookingStatus::*;
        match (self, to) {
            (Pending, Approved) | (Pending, Cancelled) | (Approved, Cancelled) | (Approved, Completed) => {
                Ok(to)
            }
            _ => Err(IllegalTransition { from: self, to }),
        }
    }
}
