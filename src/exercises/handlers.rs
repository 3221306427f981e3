use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{CompleteSetRequest, ExerciseQuery, ExerciseView, SetOutcome};
use super::services;
use crate::extract::{Json, Path, Query};
use crate::{auth::AuthUser, calendar::LocalToday, error::AppError, state::AppState};

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/exercises", get(list_exercises))
}

pub fn write_routes() -> Router<AppState> {
    Router::new().route("/exercises/:id/sets", post(complete_set))
}

/// `?date=` for one day, `?from=&to=` for a range; today when neither is given.
/// `?status=pending|completed` narrows the list.
#[instrument(skip(state))]
pub async fn list_exercises(
    State(state): State<AppState>,
    auth: AuthUser,
    LocalToday(today): LocalToday,
    Query(q): Query<ExerciseQuery>,
) -> Result<Json<Vec<ExerciseView>>, AppError> {
    let store = state.store.as_ref();
    let items = match (q.date, q.from, q.to) {
        (Some(date), None, None) => {
            services::list_for_date(store, auth.user_id, date, q.status).await?
        }
        (None, Some(from), Some(to)) => {
            services::list_range(store, auth.user_id, from, to, q.status).await?
        }
        (None, None, None) => services::list_for_date(store, auth.user_id, today, q.status).await?,
        _ => {
            return Err(AppError::validation(
                "Use either `date` or both `from` and `to`",
            ))
        }
    };
    Ok(Json(items))
}

#[instrument(skip(state, payload))]
pub async fn complete_set(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CompleteSetRequest>,
) -> Result<Json<SetOutcome>, AppError> {
    Ok(Json(
        services::complete_set(state.store.as_ref(), auth.user_id, id, payload).await?,
    ))
}
