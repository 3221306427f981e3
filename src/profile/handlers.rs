use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use tracing::instrument;

use super::dto::{ResetReport, UpdateProfileRequest};
use super::services;
use crate::extract::Json;
use crate::{auth::AuthUser, error::AppError, state::AppState, store::Profile};

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/profile", get(get_profile).patch(update_profile))
}

pub fn write_routes() -> Router<AppState> {
    Router::new().route("/profile/reset", post(reset_data))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Profile>, AppError> {
    Ok(Json(services::get_profile(state.store.as_ref(), auth.user_id).await?))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<Profile>, AppError> {
    Ok(Json(
        services::update_profile(state.store.as_ref(), auth.user_id, payload).await?,
    ))
}

/// Destructive: wipes the journey and every exercise.
#[instrument(skip(state))]
pub async fn reset_data(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ResetReport>, AppError> {
    Ok(Json(services::reset_data(state.store.as_ref(), auth.user_id).await?))
}
