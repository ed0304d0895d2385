use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use seatwise_types::api::{CreateReservationRequest, ReservationResponse, UpdateReservationRequest};
use seatwise_types::claims::AccessClaims;

use crate::auth::AppState;
use crate::error::{ApiError, run_blocking};

pub async fn list_reservations(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
) -> Result<impl IntoResponse, ApiError> {
    let reservations = run_blocking(&state, move |s| s.reservations.list(&claims)).await?;
    Ok(Json(
        reservations
            .into_iter()
            .map(ReservationResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// POST /reservations: 201 on admission, 409 `capacity_exceeded` when full,
/// 503 with `Retry-After` when the ledger was too busy to decide.
pub async fn create_reservation(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
    Json(req): Json<CreateReservationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let reservation = run_blocking(&state, move |s| {
        s.reservations.create(&claims, req.event_id, req.seats)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(ReservationResponse::from(reservation))))
}

pub async fn get_reservation(
    State(state): State<AppState>,
    Path(reservation_id): Path<Uuid>,
    Extension(claims): Extension<AccessClaims>,
) -> Result<impl IntoResponse, ApiError> {
    let reservation = run_blocking(&state, move |s| s.reservations.get(&claims, reservation_id)).await?;
    Ok(Json(ReservationResponse::from(reservation)))
}

pub async fn update_reservation(
    State(state): State<AppState>,
    Path(reservation_id): Path<Uuid>,
    Extension(claims): Extension<AccessClaims>,
    Json(req): Json<UpdateReservationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let reservation = run_blocking(&state, move |s| {
        s.reservations.update(&claims, reservation_id, req.seats)
    })
    .await?;
    Ok(Json(ReservationResponse::from(reservation)))
}

/// DELETE /reservations/{id}. Cancels; the row is kept with status `cancelled`.
pub async fn cancel_reservation(
    State(state): State<AppState>,
    Path(reservation_id): Path<Uuid>,
    Extension(claims): Extension<AccessClaims>,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(&state, move |s| s.reservations.cancel(&claims, reservation_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
