pub mod webhook;

use async_trait::async_trait;
use chrono::Utc;

use crate::db::queries;
use crate::models::{Notification, NotificationKind};
use crate::state::AppState;

/// Outbound delivery of a notification once it has been stored.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> anyhow::Result<()>;
}

/// Writes notifications to the log. Used when no webhook is configured.
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, notification: &Notification) -> anyhow::Result<()> {
        tracing::info!(
            notification_id = notification.id,
            user_id = %notification.user_id,
            kind = notification.kind.as_str(),
            message = %notification.message,
            "notification"
        );
        Ok(())
    }
}

/// Stores a notification, pushes it to live subscribers, then hands it to
/// the outbound sink. Failures are logged and never reach the caller.
pub async fn notify(
    state: &AppState,
    user_id: &str,
    booking_id: Option<&str>,
    kind: NotificationKind,
    message: String,
) {
    let created_at = Utc::now();
    let stored = {
        let conn = match state.db() {
            Ok(conn) => conn,
            Err(e) => {
                tracing::error!(error = %e, user_id, "failed to store notification");
                return;
            }
        };
        queries::insert_notification(&conn, user_id, booking_id, kind, &message, &created_at)
    };

    let id = match stored {
        Ok(id) => id,
        Err(e) => {
            tracing::error!(error = %e, user_id, "failed to store notification");
            return;
        }
    };

    let notification = Notification {
        id,
        user_id: user_id.to_string(),
        booking_id: booking_id.map(str::to_string),
        kind,
        message,
        is_read: false,
        created_at,
    };

    // No receivers just means nobody is listening right now.
    let _ = state.notification_tx.send(notification.clone());

    if let Err(e) = state.notifier.deliver(&notification).await {
        tracing::warn!(error = %e, notification_id = id, "notification delivery failed");
    }
}
