use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    NewBooking,
    BookingCancelled,
    BookingCompleted,
    NewReview,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::NewBooking => "NEW_BOOKING",
            NotificationKind::BookingCancelled => "BOOKING_CANCELLED",
            NotificationKind::BookingCompleted => "BOOKING_COMPLETED",
            NotificationKind::NewReview => "NEW_REVIEW",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NEW_BOOKING" => Some(NotificationKind::NewBooking),
            "BOOKING_CANCELLED" => Some(NotificationKind::BookingCancelled),
            "BOOKING_COMPLETED" => Some(NotificationKind::BookingCompleted),
            "NEW_REVIEW" => Some(NotificationKind::NewReview),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i64,
    pub user_id: String,
    pub booking_id: Option<String>,
    pub kind: NotificationKind,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
