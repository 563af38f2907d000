use chrono::{DateTime, Utc};
use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Actor, BookingStatus, Page, PageParams, RatingSummary, Review};

#[derive(Debug, Serialize)]
pub struct ProviderReviews {
    #[serde(flatten)]
    pub page: Page<Review>,
    pub rating: RatingSummary,
}

/// Records the client's one review of a completed booking.
pub fn create_review(
    conn: &mut Connection,
    actor: &Actor,
    booking_id: &str,
    rating: i32,
    comment: Option<String>,
    now: DateTime<Utc>,
) -> Result<Review, AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let booking = queries::get_booking(&tx, booking_id)?
        .ok_or_else(|| AppError::not_found("booking"))?;
    if booking.client_id != actor.id {
        return Err(AppError::forbidden("only the client can review a booking"));
    }
    if booking.status != BookingStatus::Completed {
        return Err(AppError::validation("only completed bookings can be reviewed"));
    }
    if !(1..=5).contains(&rating) {
        return Err(AppError::validation("rating must be between 1 and 5"));
    }
    if queries::get_review_for_booking(&tx, &booking.id)?.is_some() {
        return Err(AppError::validation("booking has already been reviewed"));
    }

    let review = Review {
        id: uuid::Uuid::new_v4().to_string(),
        booking_id: booking.id,
        client_id: booking.client_id,
        provider_id: booking.provider_id,
        rating,
        comment: comment.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
        created_at: now,
    };
    queries::insert_review(&tx, &review)?;
    tx.commit()?;

    tracing::info!(review_id = %review.id, provider_id = %review.provider_id, rating, "review created");
    Ok(review)
}

pub fn provider_reviews(
    conn: &Connection,
    provider_id: &str,
    params: &PageParams,
    default_limit: u32,
) -> Result<ProviderReviews, AppError> {
    let items = queries::list_reviews_for_provider(
        conn,
        provider_id,
        params.limit(default_limit),
        params.offset(default_limit),
    )?;
    let rating = queries::rating_summary(conn, provider_id)?;

    Ok(ProviderReviews {
        page: Page::new(items, params, default_limit, rating.count),
        rating,
    })
}
