use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::Json;
use serde::Deserialize;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::{BroadcastStream, IntervalStream};
use tokio_stream::StreamExt;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Actor, Notification, Page, PageParams};
use crate::services::auth::decode_token;
use crate::state::AppState;

const EVENT_NAME: &str = "notification";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    unread_only: Option<bool>,
}

// GET /notifications
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Query(query): Query<NotificationQuery>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<Notification>>, AppError> {
    let unread_only = query.unread_only.unwrap_or(false);
    let default_limit = state.config.default_page_size;

    let conn = state.db()?;
    let items = queries::list_notifications(
        &conn,
        &actor.id,
        unread_only,
        params.limit(default_limit),
        params.offset(default_limit),
    )?;
    let total = queries::count_notifications(&conn, &actor.id, unread_only)?;
    Ok(Json(Page::new(items, &params, default_limit, total)))
}

// PATCH /notifications/:id/read
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let conn = state.db()?;
    if !queries::mark_notification_read(&conn, &actor.id, id)? {
        return Err(AppError::not_found("notification"));
    }
    Ok(StatusCode::NO_CONTENT)
}

// POST /notifications/read-all
pub async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Result<Json<serde_json::Value>, AppError> {
    let conn = state.db()?;
    let updated = queries::mark_all_notifications_read(&conn, &actor.id)?;
    Ok(Json(serde_json::json!({ "updated": updated })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SseQuery {
    token: Option<String>,
    last_id: Option<i64>,
}

fn to_event(notification: &Notification) -> Event {
    let data = serde_json::to_string(notification).unwrap_or_default();
    Event::default()
        .id(notification.id.to_string())
        .event(EVENT_NAME)
        .data(data)
}

// GET /notifications/events
pub async fn events_stream(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SseQuery>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>, AppError> {
    // Auth via query param (EventSource can't set headers)
    let token = query.token.as_deref().ok_or(AppError::Unauthorized)?;
    let actor = decode_token(&state.config.jwt_secret, token)?;

    // Subscribe before the catch-up read so nothing falls between the two.
    let rx = state.notification_tx.subscribe();

    let catchup = match query.last_id {
        Some(last_id) => {
            let conn = state.db()?;
            queries::get_notifications_since(&conn, &actor.id, last_id)?
        }
        None => vec![],
    };
    let replayed_up_to = catchup.last().map(|n| n.id).unwrap_or(0);

    tracing::debug!(user_id = %actor.id, replayed = catchup.len(), "notification stream opened");

    let catchup_stream = tokio_stream::iter(
        catchup
            .into_iter()
            .map(|notification| Ok::<_, Infallible>(to_event(&notification))),
    );

    let user_id = actor.id;
    let live_stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(notification) if notification.user_id == user_id && notification.id > replayed_up_to => {
            Some(Ok(to_event(&notification)))
        }
        Ok(_) => None,
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "notification stream lagged");
            None
        }
    });

    let keepalive_stream = IntervalStream::new(tokio::time::interval(Duration::from_secs(30)))
        .map(|_| Ok(Event::default().comment("keepalive")));

    let merged = catchup_stream.chain(live_stream).merge(keepalive_stream);

    Ok(Sse::new(merged))
}
