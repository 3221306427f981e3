use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use tracing::instrument;

use super::dto::{AuthResponse, LoginRequest, RefreshRequest, RegisterRequest, SessionContext};
use super::jwt::{AuthUser, JwtKeys};
use super::services;
use crate::extract::Json;
use crate::{error::AppError, state::AppState};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

pub fn session_routes() -> Router<AppState> {
    Router::new().route("/session", get(get_session))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let keys = JwtKeys::from_ref(&state);
    let res = services::register(state.store.as_ref(), &keys, payload).await?;
    Ok((StatusCode::CREATED, Json(res)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let keys = JwtKeys::from_ref(&state);
    Ok(Json(services::login(state.store.as_ref(), &keys, payload).await?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let keys = JwtKeys::from_ref(&state);
    Ok(Json(
        services::refresh(state.store.as_ref(), &keys, &payload.refresh_token).await?,
    ))
}

#[instrument(skip(state))]
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> Result<StatusCode, AppError> {
    services::logout(state.store.as_ref(), auth.user_id, auth.session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn get_session(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<SessionContext>, AppError> {
    Ok(Json(
        services::session_context(state.store.as_ref(), auth.user_id).await?,
    ))
}
