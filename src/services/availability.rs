use chrono::{DateTime, Utc};
use rusqlite::{Connection, TransactionBehavior};

use crate::db::queries;
use crate::errors::{AppError, Conflicting};
use crate::models::{Actor, AvailabilityWindow, Interval, Slot, Timed};
use crate::services::scheduling::{find_conflict, free_slots};

#[derive(Debug, Clone, Default)]
pub struct WindowChange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub active: Option<bool>,
}

pub fn create_window(
    conn: &mut Connection,
    actor: &Actor,
    interval: Interval,
    now: DateTime<Utc>,
) -> Result<AvailabilityWindow, AppError> {
    if !actor.is_provider() {
        return Err(AppError::forbidden("only providers can publish availability"));
    }
    if interval.end <= now {
        return Err(AppError::validation("availability must end in the future"));
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let existing = queries::list_windows(&tx, &actor.id, Some(&interval), true)?;
    if let Some(clash) = find_conflict(&interval, &existing) {
        return Err(AppError::conflict(
            "availability overlaps an existing window",
            Conflicting::of(&clash.id, clash),
        ));
    }

    let window = AvailabilityWindow {
        id: uuid::Uuid::new_v4().to_string(),
        provider_id: actor.id.clone(),
        start: interval.start,
        end: interval.end,
        active: true,
        created_at: now,
        updated_at: now,
    };
    queries::insert_window(&tx, &window)?;
    tx.commit()?;

    tracing::info!(provider_id = %actor.id, window_id = %window.id, "availability window created");
    Ok(window)
}

pub fn update_window(
    conn: &mut Connection,
    actor: &Actor,
    window_id: &str,
    change: &WindowChange,
    now: DateTime<Utc>,
) -> Result<AvailabilityWindow, AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let mut window = owned_window(&tx, actor, window_id)?;

    let interval = Interval::new(
        change.start.unwrap_or(window.start),
        change.end.unwrap_or(window.end),
    )
    .ok_or_else(|| AppError::validation("start must be before end"))?;
    let moved = interval != window.interval();
    if moved && interval.end <= now {
        return Err(AppError::validation("availability must end in the future"));
    }
    let active = change.active.unwrap_or(window.active);

    if active {
        let others: Vec<AvailabilityWindow> =
            queries::list_windows(&tx, &window.provider_id, Some(&interval), true)?
                .into_iter()
                .filter(|w| w.id != window.id)
                .collect();
        if let Some(clash) = find_conflict(&interval, &others) {
            return Err(AppError::conflict(
                "availability overlaps an existing window",
                Conflicting::of(&clash.id, clash),
            ));
        }
    }

    // Bookings already made against the old window must stay covered.
    let booked = queries::get_active_bookings_in_range(&tx, &window.provider_id, &window.interval())?;
    if let Some(orphan) = booked
        .iter()
        .find(|b| !active || !interval.contains(&b.interval()))
    {
        return Err(AppError::conflict(
            "change would leave an active booking outside availability",
            Conflicting::of(&orphan.id, orphan),
        ));
    }

    window.start = interval.start;
    window.end = interval.end;
    window.active = active;
    window.updated_at = now;
    queries::update_window(&tx, &window)?;
    tx.commit()?;

    tracing::info!(window_id = %window.id, active, "availability window updated");
    Ok(window)
}

pub fn delete_window(conn: &mut Connection, actor: &Actor, window_id: &str) -> Result<(), AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let window = owned_window(&tx, actor, window_id)?;

    let booked = queries::get_active_bookings_in_range(&tx, &window.provider_id, &window.interval())?;
    if let Some(blocking) = booked.first() {
        return Err(AppError::conflict(
            "availability window has active bookings",
            Conflicting::of(&blocking.id, blocking),
        ));
    }

    queries::delete_window(&tx, &window.id)?;
    tx.commit()?;

    tracing::info!(window_id = %window.id, "availability window deleted");
    Ok(())
}

fn owned_window(
    conn: &Connection,
    actor: &Actor,
    window_id: &str,
) -> Result<AvailabilityWindow, AppError> {
    let window = queries::get_window(conn, window_id)?
        .ok_or_else(|| AppError::not_found("availability window"))?;
    if window.provider_id != actor.id && !actor.is_admin() {
        return Err(AppError::forbidden("availability window belongs to another provider"));
    }
    Ok(window)
}

/// Free slots of a provider across the active windows overlapping `range`.
///
/// Windows are returned whole, so bookings are fetched over the span of the
/// selected windows rather than over `range` alone.
pub fn available_slots(
    conn: &Connection,
    provider_id: &str,
    range: &Interval,
    min_minutes: Option<i64>,
) -> Result<Vec<Slot>, AppError> {
    let windows = queries::list_windows(conn, provider_id, Some(range), true)?;

    let span = windows.iter().map(Timed::interval).reduce(|acc, w| Interval {
        start: acc.start.min(w.start),
        end: acc.end.max(w.end),
    });
    let Some(span) = span else {
        return Ok(vec![]);
    };

    let bookings = queries::get_active_bookings_in_range(conn, provider_id, &span)?;
    Ok(free_slots(&windows, &bookings, min_minutes))
}
