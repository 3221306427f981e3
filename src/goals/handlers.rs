use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch},
    Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{CreateGoalRequest, GoalsPage, GoalsQuery, UpdateGoalRequest};
use super::services;
use crate::extract::{Json, Path, Query};
use crate::{
    auth::AuthUser, calendar::LocalToday, error::AppError, state::AppState, store::Goal,
};

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/goals", get(list_goals).post(create_goal))
}

pub fn write_routes() -> Router<AppState> {
    Router::new().route("/goals/:id", patch(update_goal).delete(delete_goal))
}

#[instrument(skip(state))]
pub async fn list_goals(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(q): Query<GoalsQuery>,
) -> Json<GoalsPage> {
    Json(services::goals_page(state.store.as_ref(), auth.user_id, q.date).await)
}

#[instrument(skip(state, payload))]
pub async fn create_goal(
    State(state): State<AppState>,
    auth: AuthUser,
    LocalToday(today): LocalToday,
    Json(payload): Json<CreateGoalRequest>,
) -> Result<(StatusCode, Json<Goal>), AppError> {
    let date = payload.date.unwrap_or(today);
    let goal = services::create_goal(state.store.as_ref(), auth.user_id, &payload.title, date).await?;
    Ok((StatusCode::CREATED, Json(goal)))
}

#[instrument(skip(state, payload))]
pub async fn update_goal(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateGoalRequest>,
) -> Result<Json<Goal>, AppError> {
    Ok(Json(
        services::set_completed(state.store.as_ref(), auth.user_id, id, payload.completed).await?,
    ))
}

#[instrument(skip(state))]
pub async fn delete_goal(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    services::delete_goal(state.store.as_ref(), auth.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
