use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{Actor, NotificationKind, Review};
use crate::services::notifications::notify;
use crate::services::reviews;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    booking_id: Option<String>,
    rating: Option<i32>,
    comment: Option<String>,
}

// POST /reviews
pub async fn create_review(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(body): Json<ReviewRequest>,
) -> Result<(StatusCode, Json<Review>), AppError> {
    let booking_id = body
        .booking_id
        .ok_or_else(|| AppError::validation("bookingId is required"))?;
    let rating = body
        .rating
        .ok_or_else(|| AppError::validation("rating is required"))?;

    let review = {
        let mut conn = state.db()?;
        reviews::create_review(&mut conn, &actor, &booking_id, rating, body.comment, Utc::now())?
    };

    notify(
        &state,
        &review.provider_id,
        Some(&review.booking_id),
        NotificationKind::NewReview,
        format!("New {}-star review", review.rating),
    )
    .await;

    Ok((StatusCode::CREATED, Json(review)))
}
