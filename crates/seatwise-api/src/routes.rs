use axum::{
    Json, Router, middleware,
    routing::{get, post},
};

use crate::auth::{self, AppState};
use crate::events;
use crate::middleware::require_auth;
use crate::reservations;

/// All routes. CORS and tracing layers are added by the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/health", get(health))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/events", get(events::list_events).post(events::create_event))
        .route("/events/{event_id}", get(events::get_event))
        .route("/events/{event_id}/ledger", get(events::event_ledger))
        .route(
            "/reservations",
            get(reservations::list_reservations).post(reservations::create_reservation),
        )
        .route(
            "/reservations/{reservation_id}",
            get(reservations::get_reservation)
                .patch(reservations::update_reservation)
                .delete(reservations::cancel_reservation),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
