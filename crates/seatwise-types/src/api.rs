use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Event, Reservation, ReservationStatus};

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Returned by login and by every successful refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

impl TokenPair {
    pub fn bearer(access_token: String, refresh_token: String) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "bearer".into(),
        }
    }
}

// -- Events --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateEventRequest {
    pub title: String,
    pub capacity: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EventResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub capacity: u32,
    pub confirmed_count: u32,
    pub available: u32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<Event> for EventResponse {
    fn from(event: Event) -> Self {
        Self {
            available: event.available(),
            id: event.id,
            owner_id: event.owner_id,
            title: event.title,
            capacity: event.capacity,
            confirmed_count: event.confirmed_count,
            created_at: event.created_at,
        }
    }
}

// -- Reservations --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateReservationRequest {
    pub event_id: Uuid,
    pub seats: u32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateReservationRequest {
    pub seats: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReservationResponse {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub seats: u32,
    pub status: ReservationStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<Reservation> for ReservationResponse {
    fn from(r: Reservation) -> Self {
        Self {
            id: r.id,
            event_id: r.event_id,
            user_id: r.user_id,
            seats: r.seats,
            status: r.status,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}
