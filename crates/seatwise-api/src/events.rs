use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use seatwise_core::Error;
use serde::Deserialize;
use uuid::Uuid;

use seatwise_types::api::{CreateEventRequest, EventResponse};
use seatwise_types::claims::AccessClaims;

use crate::auth::AppState;
use crate::error::{ApiError, run_blocking};

#[derive(Debug, Deserialize)]
pub struct EventQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    50
}

pub async fn create_event(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
    Json(req): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let event = run_blocking(&state, move |s| s.events.create(&claims, &req.title, req.capacity)).await?;
    Ok((StatusCode::CREATED, Json(EventResponse::from(event))))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let event = run_blocking(&state, move |s| s.events.get(event_id)).await?;
    Ok(Json(EventResponse::from(event)))
}

pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query.limit.min(200);
    let events = run_blocking(&state, move |s| s.events.list(limit)).await?;
    Ok(Json(
        events
            .into_iter()
            .map(EventResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// Admin-only view of an event's ledger against its reservation rows.
pub async fn event_ledger(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Extension(claims): Extension<AccessClaims>,
) -> Result<impl IntoResponse, ApiError> {
    if !claims.is_admin() {
        return Err(Error::Forbidden.into());
    }

    let snapshot = run_blocking(&state, move |s| s.reservations.audit(event_id)).await?;
    Ok(Json(serde_json::json!({
        "event_id": event_id,
        "capacity": snapshot.capacity,
        "confirmed_count": snapshot.confirmed_count,
        "confirmed_seats": snapshot.confirmed_seats,
        "consistent": snapshot.is_consistent(),
    })))
}
