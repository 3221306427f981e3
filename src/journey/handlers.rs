use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use tracing::instrument;

use super::dto::{DestinationRequest, WeeklyGoalsRequest};
use super::engine::JourneyState;
use super::services;
use crate::extract::Json;
use crate::{auth::AuthUser, calendar::LocalToday, error::AppError, state::AppState};

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/journey", get(get_journey))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/journey/destination", post(set_destination))
        .route("/journey/start", post(start_journey))
        .route("/journey/weekly-goals", post(submit_weekly_goals))
}

#[instrument(skip(state))]
pub async fn get_journey(State(state): State<AppState>, auth: AuthUser) -> Json<JourneyState> {
    Json(services::load_state(state.store.as_ref(), auth.user_id).await)
}

#[instrument(skip(state, payload))]
pub async fn set_destination(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<DestinationRequest>,
) -> Result<Json<JourneyState>, AppError> {
    let s = services::set_destination(state.store.as_ref(), auth.user_id, &payload.destination).await?;
    Ok(Json(s))
}

#[instrument(skip(state))]
pub async fn start_journey(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<JourneyState>, AppError> {
    Ok(Json(services::start_journey(state.store.as_ref(), auth.user_id).await?))
}

#[instrument(skip(state, payload))]
pub async fn submit_weekly_goals(
    State(state): State<AppState>,
    auth: AuthUser,
    LocalToday(today): LocalToday,
    Json(payload): Json<WeeklyGoalsRequest>,
) -> Result<Json<JourneyState>, AppError> {
    let s = services::submit_weekly_goals(
        state.store.as_ref(),
        auth.user_id,
        &payload.activities,
        today,
    )
    .await?;
    Ok(Json(s))
}
