use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use tracing::instrument;

use super::dto::{AddExerciseRequest, CompleteWeekRequest, WeekUnlocked, WeekView};
use super::services;
use crate::extract::{Json, Path};
use crate::{
    auth::AuthUser, calendar::LocalToday, error::AppError, exercises::dto::ExerciseView,
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/week/:week", get(get_week))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/week/:week/exercises", post(add_exercise))
        .route("/week/:week/complete", post(complete_week))
}

#[instrument(skip(state))]
pub async fn get_week(
    State(state): State<AppState>,
    auth: AuthUser,
    LocalToday(today): LocalToday,
    Path(week): Path<i32>,
) -> Result<Json<WeekView>, AppError> {
    Ok(Json(
        services::open_week(state.store.as_ref(), auth.user_id, week, today).await?,
    ))
}

#[instrument(skip(state, payload))]
pub async fn add_exercise(
    State(state): State<AppState>,
    auth: AuthUser,
    LocalToday(today): LocalToday,
    Path(week): Path<i32>,
    Json(payload): Json<AddExerciseRequest>,
) -> Result<(StatusCode, Json<ExerciseView>), AppError> {
    let ex = services::add_exercise(state.store.as_ref(), auth.user_id, week, payload, today).await?;
    Ok((StatusCode::CREATED, Json(ex)))
}

#[instrument(skip(state, payload))]
pub async fn complete_week(
    State(state): State<AppState>,
    auth: AuthUser,
    LocalToday(today): LocalToday,
    Path(week): Path<i32>,
    Json(payload): Json<CompleteWeekRequest>,
) -> Result<Json<WeekUnlocked>, AppError> {
    Ok(Json(
        services::complete_week(state.store.as_ref(), auth.user_id, week, &payload.ratings, today)
            .await?,
    ))
}
