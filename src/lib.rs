pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;
pub mod state;

use std::sync::Arc;

use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route(
            "/users/me",
            get(handlers::users::get_me).put(handlers::users::put_me),
        )
        .route("/providers", get(handlers::providers::list_providers))
        .route(
            "/providers/availabilities",
            get(handlers::availability::list_my_windows).post(handlers::availability::create_window),
        )
        .route(
            "/providers/availabilities/:id",
            patch(handlers::availability::update_window).delete(handlers::availability::delete_window),
        )
        .route("/providers/:id", get(handlers::providers::get_provider))
        .route(
            "/providers/:id/availabilities",
            get(handlers::providers::get_provider_availabilities),
        )
        .route(
            "/providers/:id/available-slots",
            get(handlers::providers::get_available_slots),
        )
        .route(
            "/providers/:id/reviews",
            get(handlers::providers::get_provider_reviews),
        )
        .route(
            "/services",
            get(handlers::services::list_services).post(handlers::services::create_service),
        )
        .route(
            "/services/:id",
            get(handlers::services::get_service)
                .patch(handlers::services::update_service)
                .delete(handlers::services::delete_service),
        )
        .route(
            "/services/:id/variations",
            post(handlers::services::add_variation),
        )
        .route(
            "/services/:id/variations/:variation_id",
            patch(handlers::services::update_variation).delete(handlers::services::delete_variation),
        )
        .route(
            "/bookings",
            get(handlers::bookings::list_bookings).post(handlers::bookings::create_booking),
        )
        .route("/bookings/:id", get(handlers::bookings::get_booking))
        .route("/bookings/:id/cancel", patch(handlers::bookings::cancel_booking))
        .route("/bookings/:id/complete", patch(handlers::bookings::complete_booking))
        .route("/bookings/:id/calendar.ics", get(handlers::bookings::download_ics))
        .route("/reviews", post(handlers::reviews::create_review))
        .route("/notifications", get(handlers::notifications::list_notifications))
        .route("/notifications/read-all", post(handlers::notifications::mark_all_read))
        .route("/notifications/events", get(handlers::notifications::events_stream))
        .route("/notifications/:id/read", patch(handlers::notifications::mark_read))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
