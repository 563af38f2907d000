use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{Actor, User};
use crate::services::profiles::{self, ProfileDraft};
use crate::state::AppState;

// GET /users/me
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Result<Json<User>, AppError> {
    let conn = state.db()?;
    Ok(Json(profiles::get_profile(&conn, &actor.id)?))
}

#[derive(Deserialize)]
pub struct ProfileRequest {
    name: Option<String>,
    email: Option<String>,
    bio: Option<String>,
}

// PUT /users/me
pub async fn put_me(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(body): Json<ProfileRequest>,
) -> Result<Json<User>, AppError> {
    let draft = ProfileDraft {
        name: body.name,
        email: body.email,
        bio: body.bio,
    };
    let conn = state.db()?;
    Ok(Json(profiles::upsert_profile(&conn, &actor, draft, Utc::now())?))
}
