use std::env;

/// Upper bound for `BOOKING_GRACE_MINUTES`: one week.
pub const MAX_GRACE_MINUTES: i64 = 7 * 24 * 60;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub notification_webhook_url: Option<String>,
    pub notification_webhook_secret: String,
    /// How far in the past a booking may start, in minutes.
    pub booking_grace_minutes: i64,
    pub default_page_size: u32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set, falling back to an insecure default");
            "changeme".to_string()
        });

        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "servicebook.db".to_string()),
            jwt_secret,
            notification_webhook_url: env::var("NOTIFICATION_WEBHOOK_URL")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            notification_webhook_secret: env::var("NOTIFICATION_WEBHOOK_SECRET")
                .unwrap_or_default(),
            booking_grace_minutes: grace_minutes(env::var("BOOKING_GRACE_MINUTES").ok()),
            default_page_size: env::var("DEFAULT_PAGE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20),
        }
    }
}

fn grace_minutes(raw: Option<String>) -> i64 {
    let Some(minutes) = raw.and_then(|v| v.trim().parse::<i64>().ok()) else {
        return 5;
    };
    let clamped = minutes.clamp(0, MAX_GRACE_MINUTES);
    if clamped != minutes {
        tracing::warn!(minutes, clamped, "BOOKING_GRACE_MINUTES out of range, clamping");
    }
    clamped
}
