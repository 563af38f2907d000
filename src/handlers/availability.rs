use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use super::{datetime_field, RangeQuery};
use crate::db::queries;
use crate::errors::AppError;
use crate::models::interval::parse_datetime;
use crate::models::{Actor, AvailabilityWindow, Interval};
use crate::services::availability::{self, WindowChange};
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWindowRequest {
    start_datetime: Option<String>,
    end_datetime: Option<String>,
}

// POST /providers/availabilities
pub async fn create_window(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(body): Json<CreateWindowRequest>,
) -> Result<(StatusCode, Json<AvailabilityWindow>), AppError> {
    let start = datetime_field("startDatetime", body.start_datetime.as_deref())?;
    let end = datetime_field("endDatetime", body.end_datetime.as_deref())?;
    let interval = Interval::new(start, end)
        .ok_or_else(|| AppError::validation("startDatetime must be before endDatetime"))?;

    let mut conn = state.db()?;
    let window = availability::create_window(&mut conn, &actor, interval, Utc::now())?;
    Ok((StatusCode::CREATED, Json(window)))
}

// GET /providers/availabilities
pub async fn list_my_windows(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Query(range): Query<RangeQuery>,
) -> Result<Json<Vec<AvailabilityWindow>>, AppError> {
    let range = range.optional()?;
    let conn = state.db()?;
    Ok(Json(queries::list_windows(&conn, &actor.id, range.as_ref(), false)?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWindowRequest {
    start_datetime: Option<String>,
    end_datetime: Option<String>,
    active: Option<bool>,
}

// PATCH /providers/availabilities/:id
pub async fn update_window(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<String>,
    Json(body): Json<UpdateWindowRequest>,
) -> Result<Json<AvailabilityWindow>, AppError> {
    let parse = |name: &str, value: Option<String>| match value {
        Some(raw) => parse_datetime(&raw)
            .map(Some)
            .ok_or_else(|| AppError::validation(format!("{name} is not a valid datetime"))),
        None => Ok(None),
    };
    let change = WindowChange {
        start: parse("startDatetime", body.start_datetime)?,
        end: parse("endDatetime", body.end_datetime)?,
        active: body.active,
    };

    let mut conn = state.db()?;
    Ok(Json(availability::update_window(&mut conn, &actor, &id, &change, Utc::now())?))
}

// DELETE /providers/availabilities/:id
pub async fn delete_window(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let mut conn = state.db()?;
    availability::delete_window(&mut conn, &actor, &id)?;
    Ok(StatusCode::NO_CONTENT)
}
