use axum::{
    extract::State,
    routing::get,
    Router,
};
use tracing::instrument;

use super::dto::{Dashboard, Diary, DiaryQuery, HelpSection, ProgressPage};
use super::services;
use crate::extract::{Json, Query};
use crate::{auth::AuthUser, calendar::LocalToday, error::AppError, state::AppState};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/progress", get(progress))
        .route("/diary", get(diary))
        .route("/help", get(help))
}

#[instrument(skip(state))]
pub async fn dashboard(
    State(state): State<AppState>,
    auth: AuthUser,
    LocalToday(today): LocalToday,
) -> Json<Dashboard> {
    Json(services::dashboard(state.store.as_ref(), auth.user_id, today).await)
}

#[instrument(skip(state))]
pub async fn progress(State(state): State<AppState>, auth: AuthUser) -> Json<ProgressPage> {
    Json(services::progress(state.store.as_ref(), auth.user_id).await)
}

#[instrument(skip(state))]
pub async fn diary(
    State(state): State<AppState>,
    auth: AuthUser,
    LocalToday(today): LocalToday,
    Query(q): Query<DiaryQuery>,
) -> Result<Json<Diary>, AppError> {
    Ok(Json(
        services::diary(state.store.as_ref(), auth.user_id, q.from, q.to, today).await?,
    ))
}

pub async fn help() -> Json<Vec<HelpSection>> {
    Json(services::help())
}
