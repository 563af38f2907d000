use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use servicebook::config::AppConfig;
use servicebook::db;
use servicebook::services::notifications::webhook::WebhookSink;
use servicebook::services::notifications::{LogSink, NotificationSink};
use servicebook::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    let notifier: Box<dyn NotificationSink> = match &config.notification_webhook_url {
        Some(url) => {
            if config.notification_webhook_secret.is_empty() {
                tracing::warn!("NOTIFICATION_WEBHOOK_SECRET not set, webhook payloads are signed with an empty key");
            }
            tracing::info!("delivering notifications to webhook (url: {url})");
            Box::new(WebhookSink::new(url.clone(), config.notification_webhook_secret.clone()))
        }
        None => {
            tracing::info!("no notification webhook configured, logging notifications");
            Box::new(LogSink)
        }
    };

    let state = Arc::new(AppState::new(conn, config.clone(), notifier));
    let app = servicebook::app(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
