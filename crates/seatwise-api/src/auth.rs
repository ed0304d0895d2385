use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use seatwise_core::{AdmissionController, AuthConfig, Error, EventService, SessionManager};
use seatwise_db::Database;
use seatwise_types::api::{LoginRequest, RegisterRequest, RegisterResponse};
use seatwise_types::claims::{AccessClaims, Role};

use crate::error::{ApiError, run_blocking};
use crate::middleware::bearer_token;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub sessions: SessionManager,
    pub events: EventService,
    pub reservations: AdmissionController,
    /// Username that registers as `admin` instead of `user`.
    pub admin_username: Option<String>,
}

impl AppStateInner {
    pub fn new(
        db: Arc<Database>,
        config: &AuthConfig,
        admin_username: Option<String>,
    ) -> seatwise_core::Result<Self> {
        Ok(Self {
            sessions: SessionManager::new(db.clone(), config)?,
            events: EventService::new(db.clone()),
            reservations: AdmissionController::new(db),
            admin_username,
        })
    }
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Validate input
    if req.username.len() < 3 || req.username.len() > 32 {
        return Err(Error::Validation("username must be 3-32 characters".into()).into());
    }
    if req.password.len() < 8 {
        return Err(Error::Validation("password must be at least 8 characters".into()).into());
    }
    if !req.email.contains('@') {
        return Err(Error::Validation("email is not valid".into()).into());
    }

    let role = if state.admin_username.as_deref() == Some(req.username.as_str()) {
        Role::Admin
    } else {
        Role::User
    };

    let user = run_blocking(&state, move |s| {
        s.sessions.register(&req.username, &req.email, &req.password, role)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(RegisterResponse { user_id: user.id })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let pair = run_blocking(&state, move |s| s.sessions.login(&req.username, &req.password)).await?;
    Ok(Json(pair))
}

/// POST /auth/refresh. The refresh token is presented as the bearer credential.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let presented = bearer_token(&headers)
        .ok_or(ApiError(Error::Unauthorized))?
        .to_string();

    let pair = run_blocking(&state, move |s| s.sessions.refresh(&presented)).await?;
    Ok(Json(pair))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(&state, move |s| s.sessions.logout(claims.sub)).await?;
    Ok(StatusCode::NO_CONTENT)
}
