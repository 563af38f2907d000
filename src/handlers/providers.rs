use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::RangeQuery;
use crate::db::queries;
use crate::errors::AppError;
use crate::models::{AvailabilityWindow, Page, PageParams, Slot, User};
use crate::services::availability;
use crate::services::profiles::{self, ProviderProfile};
use crate::services::reviews::{self, ProviderReviews};
use crate::state::AppState;

// GET /providers
pub async fn list_providers(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<User>>, AppError> {
    let default_limit = state.config.default_page_size;
    let conn = state.db()?;
    let items = queries::list_providers(&conn, params.limit(default_limit), params.offset(default_limit))?;
    let total = queries::count_providers(&conn)?;
    Ok(Json(Page::new(items, &params, default_limit, total)))
}

// GET /providers/:id
pub async fn get_provider(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ProviderProfile>, AppError> {
    let conn = state.db()?;
    Ok(Json(profiles::provider_profile(&conn, &id)?))
}

// GET /providers/:id/availabilities
pub async fn get_provider_availabilities(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(range): Query<RangeQuery>,
) -> Result<Json<Vec<AvailabilityWindow>>, AppError> {
    let range = range.optional()?;
    let conn = state.db()?;
    let windows = queries::list_windows(&conn, &id, range.as_ref(), true)?;
    Ok(Json(windows))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotsQuery {
    duration_minutes: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotsResponse {
    available_slots: Vec<Slot>,
    total_slots: usize,
}

// GET /providers/:id/available-slots
pub async fn get_available_slots(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(range): Query<RangeQuery>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<SlotsResponse>, AppError> {
    let range = range.required()?;
    if let Some(minutes) = query.duration_minutes {
        if minutes <= 0 {
            return Err(AppError::validation("durationMinutes must be positive"));
        }
    }

    let slots = {
        let conn = state.db()?;
        availability::available_slots(&conn, &id, &range, query.duration_minutes)?
    };
    tracing::debug!(provider_id = %id, slots = slots.len(), "computed available slots");

    Ok(Json(SlotsResponse {
        total_slots: slots.len(),
        available_slots: slots,
    }))
}

// GET /providers/:id/reviews
pub async fn get_provider_reviews(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Json<ProviderReviews>, AppError> {
    let conn = state.db()?;
    Ok(Json(reviews::provider_reviews(&conn, &id, &params, state.config.default_page_size)?))
}
