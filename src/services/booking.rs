use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, TransactionBehavior};

use crate::config::MAX_GRACE_MINUTES;
use crate::db::queries;
use crate::errors::{AppError, Conflicting};
use crate::models::{Actor, Booking, BookingStatus, Interval, Timed};
use crate::services::scheduling::find_conflict;

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub service_id: String,
    pub variation_id: String,
    pub start: DateTime<Utc>,
}

/// Validates and inserts a booking in one immediate transaction, so the
/// overlap check and the insert cannot interleave with another writer.
///
/// Checks run in a fixed order and the first failure wins: service, variation,
/// start time, availability, overlap, self-booking.
pub fn create_booking(
    conn: &mut Connection,
    client: &Actor,
    request: &NewBooking,
    now: DateTime<Utc>,
    grace_minutes: i64,
) -> Result<Booking, AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let service = queries::get_service(&tx, &request.service_id)?
        .ok_or_else(|| AppError::not_found("service"))?;
    if !service.active {
        return Err(AppError::validation("service is not active"));
    }

    let variation = queries::get_variation(&tx, &request.variation_id)?
        .ok_or_else(|| AppError::not_found("variation"))?;
    if !variation.active {
        return Err(AppError::validation("variation is not active"));
    }
    if variation.service_id != service.id {
        return Err(AppError::validation("variation does not belong to this service"));
    }

    let slot = Interval::starting_at(request.start, i64::from(variation.duration_minutes))
        .ok_or_else(|| AppError::validation("variation has no duration"))?;

    let grace = Duration::minutes(grace_minutes.clamp(0, MAX_GRACE_MINUTES));
    if slot.start < now - grace {
        return Err(AppError::validation("booking start time is in the past"));
    }

    let windows = queries::list_windows(&tx, &service.provider_id, Some(&slot), true)?;
    if !windows.iter().any(|w| w.interval().contains(&slot)) {
        return Err(AppError::validation(
            "provider is not available for the whole requested time",
        ));
    }

    let booked = queries::get_active_bookings_in_range(&tx, &service.provider_id, &slot)?;
    if let Some(clash) = find_conflict(&slot, &booked) {
        return Err(AppError::conflict(
            "requested time overlaps an existing booking",
            Conflicting::of(&clash.id, clash),
        ));
    }

    if client.id == service.provider_id {
        return Err(AppError::validation("providers cannot book their own services"));
    }

    let pending = BookingStatus::Pending;
    let booking = Booking {
        id: uuid::Uuid::new_v4().to_string(),
        client_id: client.id.clone(),
        provider_id: service.provider_id.clone(),
        service_id: service.id.clone(),
        variation_id: variation.id.clone(),
        start: slot.start,
        end: slot.end,
        price_cents: variation.price_cents,
        // No manual approval step: every new booking is approved on creation.
        status: pending.transition(BookingStatus::Approved)?,
        cancellation_reason: None,
        cancelled_by: None,
        created_at: now,
        updated_at: now,
    };
    queries::insert_booking(&tx, &booking)?;
    tx.commit()?;

    tracing::info!(
        booking_id = %booking.id,
        provider_id = %booking.provider_id,
        client_id = %booking.client_id,
        start = %booking.start,
        "booking created"
    );
    Ok(booking)
}

/// Cancels a booking on behalf of its client, its provider or an admin.
pub fn cancel_booking(
    conn: &mut Connection,
    actor: &Actor,
    booking_id: &str,
    reason: Option<String>,
    now: DateTime<Utc>,
) -> Result<Booking, AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let mut booking = queries::get_booking(&tx, booking_id)?
        .ok_or_else(|| AppError::not_found("booking"))?;
    if !booking.is_participant(&actor.id) && !actor.is_admin() {
        return Err(AppError::forbidden("not a participant of this booking"));
    }

    booking.status = booking.status.transition(BookingStatus::Cancelled)?;
    booking.cancellation_reason = reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());
    booking.cancelled_by = Some(actor.id.clone());
    booking.updated_at = now;
    queries::update_booking_status(&tx, &booking)?;
    tx.commit()?;

    tracing::info!(booking_id = %booking.id, cancelled_by = %actor.id, "booking cancelled");
    Ok(booking)
}

/// Marks a finished booking as completed. Only its provider (or an admin)
/// may do this, and only once the booked time is over.
pub fn complete_booking(
    conn: &mut Connection,
    actor: &Actor,
    booking_id: &str,
    now: DateTime<Utc>,
) -> Result<Booking, AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let mut booking = queries::get_booking(&tx, booking_id)?
        .ok_or_else(|| AppError::not_found("booking"))?;
    if booking.provider_id != actor.id && !actor.is_admin() {
        return Err(AppError::forbidden("only the provider can complete a booking"));
    }
    if booking.end > now {
        return Err(AppError::validation("booking has not ended yet"));
    }

    booking.status = booking.status.transition(BookingStatus::Completed)?;
    booking.updated_at = now;
    queries::update_booking_status(&tx, &booking)?;
    tx.commit()?;

    tracing::info!(booking_id = %booking.id, "booking completed");
    Ok(booking)
}

/// Loads a booking the caller takes part in. Admins see every booking.
pub fn visible_booking(conn: &Connection, actor: &Actor, booking_id: &str) -> Result<Booking, AppError> {
    let booking = queries::get_booking(conn, booking_id)?
        .ok_or_else(|| AppError::not_found("booking"))?;
    if !booking.is_participant(&actor.id) && !actor.is_admin() {
        return Err(AppError::forbidden("not a participant of this booking"));
    }
    Ok(booking)
}

/// The user on the other side of a booking from `actor_id`, or both parties
/// when the actor is neither (an admin acting on their behalf).
pub fn counterparts<'a>(booking: &'a Booking, actor_id: &str) -> Vec<&'a str> {
    if actor_id == booking.client_id {
        vec![booking.provider_id.as_str()]
    } else if actor_id == booking.provider_id {
        vec![booking.client_id.as_str()]
    } else {
        vec![booking.client_id.as_str(), booking.provider_id.as_str()]
    }
}
