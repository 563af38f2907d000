use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::datetime_field;
use crate::db::queries::{self, BookingFilter, Side};
use crate::errors::AppError;
use crate::models::{Actor, Booking, BookingStatus, NotificationKind, Page, PageParams};
use crate::services::booking::{self, NewBooking};
use crate::services::calendar::generate_ics;
use crate::services::notifications::notify;
use crate::state::AppState;

fn when(start: &DateTime<Utc>) -> String {
    start.format("%Y-%m-%d %H:%M UTC").to_string()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    service_id: Option<String>,
    variation_id: Option<String>,
    start_datetime: Option<String>,
}

// POST /bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(body): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let request = NewBooking {
        service_id: body
            .service_id
            .ok_or_else(|| AppError::validation("serviceId is required"))?,
        variation_id: body
            .variation_id
            .ok_or_else(|| AppError::validation("variationId is required"))?,
        start: datetime_field("startDatetime", body.start_datetime.as_deref())?,
    };

    let booking = {
        let mut conn = state.db()?;
        booking::create_booking(
            &mut conn,
            &actor,
            &request,
            Utc::now(),
            state.config.booking_grace_minutes,
        )?
    };

    notify(
        &state,
        &booking.provider_id,
        Some(&booking.id),
        NotificationKind::NewBooking,
        format!("New booking on {}", when(&booking.start)),
    )
    .await;

    Ok((StatusCode::CREATED, Json(booking)))
}

#[derive(Deserialize)]
pub struct BookingQuery {
    #[serde(rename = "as")]
    side: Option<String>,
    status: Option<String>,
}

// GET /bookings
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Query(query): Query<BookingQuery>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<Booking>>, AppError> {
    let side = match query.side.as_deref() {
        None => Side::Either,
        Some("client") => Side::Client,
        Some("provider") => Side::Provider,
        Some(other) => {
            return Err(AppError::validation(format!(
                "as must be client or provider, got {other:?}"
            )))
        }
    };
    let status = query
        .status
        .as_deref()
        .map(|s| {
            BookingStatus::parse(s)
                .ok_or_else(|| AppError::validation(format!("unknown booking status {s:?}")))
        })
        .transpose()?;

    let filter = BookingFilter {
        user_id: actor.id,
        side,
        status,
    };
    let default_limit = state.config.default_page_size;

    let conn = state.db()?;
    let items = queries::list_bookings(&conn, &filter, params.limit(default_limit), params.offset(default_limit))?;
    let total = queries::count_bookings(&conn, &filter)?;
    Ok(Json(Page::new(items, &params, default_limit, total)))
}

// GET /bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let conn = state.db()?;
    Ok(Json(booking::visible_booking(&conn, &actor, &id)?))
}

#[derive(Deserialize, Default)]
pub struct CancelRequest {
    reason: Option<String>,
}

impl CancelRequest {
    /// The body is optional; when present it must be a valid request.
    fn from_body(body: &[u8]) -> Result<Self, AppError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| AppError::validation(format!("invalid cancel request: {e}")))
    }
}

// PATCH /bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Booking>, AppError> {
    let reason = CancelRequest::from_body(&body)?.reason;

    let booking = {
        let mut conn = state.db()?;
        booking::cancel_booking(&mut conn, &actor, &id, reason, Utc::now())?
    };

    let message = match &booking.cancellation_reason {
        Some(reason) => format!("Booking on {} was cancelled: {reason}", when(&booking.start)),
        None => format!("Booking on {} was cancelled", when(&booking.start)),
    };
    for user_id in booking::counterparts(&booking, &actor.id) {
        notify(
            &state,
            user_id,
            Some(&booking.id),
            NotificationKind::BookingCancelled,
            message.clone(),
        )
        .await;
    }

    Ok(Json(booking))
}

// PATCH /bookings/:id/complete
pub async fn complete_booking(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let booking = {
        let mut conn = state.db()?;
        booking::complete_booking(&mut conn, &actor, &id, Utc::now())?
    };

    notify(
        &state,
        &booking.client_id,
        Some(&booking.id),
        NotificationKind::BookingCompleted,
        format!("Booking on {} is complete. You can now leave a review", when(&booking.start)),
    )
    .await;

    Ok(Json(booking))
}

// GET /bookings/:id/calendar.ics
pub async fn download_ics(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let (booking, service_title, provider_name) = {
        let conn = state.db()?;
        let booking = booking::visible_booking(&conn, &actor, &id)?;
        let service_title = queries::get_service(&conn, &booking.service_id)?
            .map(|s| s.title)
            .unwrap_or_else(|| "Booking".to_string());
        let provider_name = queries::get_user(&conn, &booking.provider_id)?
            .map(|u| u.name)
            .unwrap_or_else(|| "your provider".to_string());
        (booking, service_title, provider_name)
    };

    let ics = generate_ics(&booking, &service_title, &provider_name);
    let filename = format!("booking-{}.ics", booking.id);

    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        ics,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_body_is_optional() {
        assert_eq!(CancelRequest::from_body(b"").unwrap().reason, None);
        assert_eq!(CancelRequest::from_body(b"  \n").unwrap().reason, None);
        assert_eq!(CancelRequest::from_body(b"{}").unwrap().reason, None);
        let parsed = CancelRequest::from_body(br#"{"reason":"out sick"}"#).unwrap();
        assert_eq!(parsed.reason.as_deref(), Some("out sick"));
    }

    #[test]
    fn test_malformed_cancel_body_rejected() {
        for body in [&br#"{"reason": 5}"#[..], b"not json", b"[1,2]"] {
            let result = CancelRequest::from_body(body);
            assert!(matches!(result, Err(AppError::Validation(_))));
        }
    }
}
