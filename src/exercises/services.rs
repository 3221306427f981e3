use time::{Date, Duration};
use tracing::{info, warn};
use uuid::Uuid;

use super::dto::{CompleteSetRequest, ExerciseView, SetOutcome, StatusFilter};
use super::model::{CompletedSet, SetError};
use crate::calendar::{week_of, week_range};
use crate::error::AppError;
use crate::store::{Exercise, JourneyProgress, Store};
use crate::week::flow::{week_stage, WeekStage};

const MAX_COMMENT_LEN: usize = 500;
const MAX_RANGE_DAYS: i64 = 366;

impl From<SetError> for AppError {
    fn from(e: SetError) -> Self {
        match e {
            SetError::RatingOutOfRange => AppError::Validation(e.to_string()),
            SetError::OutOfOrder { .. } | SetError::AlreadyComplete(_) => {
                AppError::Conflict(e.to_string())
            }
        }
    }
}

/// Records set `req.index` with its rating. Nothing is committed unless the store
/// accepts the write, and a concurrent submission for the same index loses with 409.
pub async fn complete_set(
    store: &dyn Store,
    user_id: Uuid,
    exercise_id: Uuid,
    req: CompleteSetRequest,
) -> Result<SetOutcome, AppError> {
    let exercise = store
        .get_exercise(user_id, exercise_id)
        .await?
        .ok_or(AppError::NotFound("exercise"))?;

    let journey = store.get_journey(user_id).await?;
    let week = journey.as_ref().and_then(|j| exercise_week(j, exercise.date));
    if let (Some(j), Some(w)) = (&journey, week) {
        if j.is_week_completed(w) {
            return Err(AppError::forbidden(format!(
                "Week {w} is completed and read-only"
            )));
        }
    }

    let comment = req
        .comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    if comment.as_ref().is_some_and(|c| c.chars().count() > MAX_COMMENT_LEN) {
        return Err(AppError::validation(format!(
            "Comment must be at most {MAX_COMMENT_LEN} characters"
        )));
    }

    let next = exercise.with_completed_set(
        req.index,
        CompletedSet {
            rating: req.rating,
            comment,
        },
    )?;
    let completed = next.len() >= exercise.target_sets();

    let saved = store
        .save_completed_sets(user_id, exercise_id, exercise.completed_count(), &next, completed)
        .await?
        .ok_or_else(|| AppError::conflict("This set was already recorded, refresh and try again"))?;

    info!(
        %user_id,
        exercise_id = %saved.id,
        set = req.index + 1,
        of = saved.target_sets(),
        completed,
        "exercise set completed"
    );

    let week_stage = match (&journey, week) {
        (Some(j), Some(w)) => stage_after_save(store, user_id, j, w).await,
        _ => None,
    };
    Ok(SetOutcome {
        exercise: saved.into(),
        week,
        week_stage,
    })
}

fn exercise_week(journey: &JourneyProgress, date: Date) -> Option<i32> {
    journey.journey_start_date.and_then(|start| week_of(start, date))
}

async fn stage_after_save(
    store: &dyn Store,
    user_id: Uuid,
    journey: &JourneyProgress,
    week: i32,
) -> Option<WeekStage> {
    let start = journey.journey_start_date?;
    let range = week_range(start, week);
    match store.list_exercises(user_id, range.start(), range.end()).await {
        Ok(exercises) => Some(week_stage(journey, &range, &exercises)),
        Err(e) => {
            warn!(error = %e, %user_id, week, "week exercises fetch failed");
            None
        }
    }
}

pub async fn list_for_date(
    store: &dyn Store,
    user_id: Uuid,
    date: Date,
    status: StatusFilter,
) -> Result<Vec<ExerciseView>, AppError> {
    list_range(store, user_id, date, date, status).await
}

pub async fn list_range(
    store: &dyn Store,
    user_id: Uuid,
    from: Date,
    to: Date,
    status: StatusFilter,
) -> Result<Vec<ExerciseView>, AppError> {
    check_range(from, to)?;
    let exercises: Vec<Exercise> = store.list_exercises(user_id, from, to).await?;
    Ok(exercises
        .into_iter()
        .filter(|e| status.keeps(e))
        .map(ExerciseView::from)
        .collect())
}

pub(crate) fn check_range(from: Date, to: Date) -> Result<(), AppError> {
    if from > to {
        return Err(AppError::validation("`from` must not be after `to`"));
    }
    if to - from > Duration::days(MAX_RANGE_DAYS) {
        return Err(AppError::validation(format!(
            "Date range is limited to {MAX_RANGE_DAYS} days"
        )));
    }
    Ok(())
}
