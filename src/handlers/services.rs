use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::db::queries::{self, ServiceFilter};
use crate::errors::AppError;
use crate::models::{Actor, Page, PageParams, Service, ServiceWithVariations, Variation};
use crate::services::catalog::{self, ServiceDraft, VariationDraft};
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceQuery {
    provider_id: Option<String>,
    category: Option<String>,
    q: Option<String>,
}

// GET /services
pub async fn list_services(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ServiceQuery>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<Service>>, AppError> {
    let filter = ServiceFilter {
        provider_id: query.provider_id,
        category: query.category.filter(|c| !c.trim().is_empty()),
        search: query.q.map(|q| q.trim().to_string()).filter(|q| !q.is_empty()),
    };
    let default_limit = state.config.default_page_size;

    let conn = state.db()?;
    let items = queries::list_services(&conn, &filter, params.limit(default_limit), params.offset(default_limit))?;
    let total = queries::count_services(&conn, &filter)?;
    Ok(Json(Page::new(items, &params, default_limit, total)))
}

#[derive(Deserialize)]
pub struct ServiceRequest {
    title: Option<String>,
    description: Option<String>,
    category: Option<String>,
    active: Option<bool>,
}

impl From<ServiceRequest> for ServiceDraft {
    fn from(body: ServiceRequest) -> Self {
        ServiceDraft {
            title: body.title,
            description: body.description,
            category: body.category,
            active: body.active,
        }
    }
}

// POST /services
pub async fn create_service(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(body): Json<ServiceRequest>,
) -> Result<(StatusCode, Json<Service>), AppError> {
    let conn = state.db()?;
    let service = catalog::create_service(&conn, &actor, body.into(), Utc::now())?;
    Ok((StatusCode::CREATED, Json(service)))
}

// GET /services/:id
pub async fn get_service(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ServiceWithVariations>, AppError> {
    let conn = state.db()?;
    Ok(Json(catalog::get_service_with_variations(&conn, &id)?))
}

// PATCH /services/:id
pub async fn update_service(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<String>,
    Json(body): Json<ServiceRequest>,
) -> Result<Json<Service>, AppError> {
    let conn = state.db()?;
    Ok(Json(catalog::update_service(&conn, &actor, &id, body.into(), Utc::now())?))
}

// DELETE /services/:id
pub async fn delete_service(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let conn = state.db()?;
    catalog::deactivate_service(&conn, &actor, &id, Utc::now())?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariationRequest {
    name: Option<String>,
    price_cents: Option<i64>,
    duration_minutes: Option<i32>,
    active: Option<bool>,
}

impl From<VariationRequest> for VariationDraft {
    fn from(body: VariationRequest) -> Self {
        VariationDraft {
            name: body.name,
            price_cents: body.price_cents,
            duration_minutes: body.duration_minutes,
            active: body.active,
        }
    }
}

// POST /services/:id/variations
pub async fn add_variation(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<String>,
    Json(body): Json<VariationRequest>,
) -> Result<(StatusCode, Json<Variation>), AppError> {
    let conn = state.db()?;
    let variation = catalog::add_variation(&conn, &actor, &id, body.into(), Utc::now())?;
    Ok((StatusCode::CREATED, Json(variation)))
}

// PATCH /services/:id/variations/:variation_id
pub async fn update_variation(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path((id, variation_id)): Path<(String, String)>,
    Json(body): Json<VariationRequest>,
) -> Result<Json<Variation>, AppError> {
    let conn = state.db()?;
    Ok(Json(catalog::update_variation(&conn, &actor, &id, &variation_id, body.into(), Utc::now())?))
}

// DELETE /services/:id/variations/:variation_id
pub async fn delete_variation(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path((id, variation_id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    let conn = state.db()?;
    catalog::deactivate_variation(&conn, &actor, &id, &variation_id, Utc::now())?;
    Ok(StatusCode::NO_CONTENT)
}
