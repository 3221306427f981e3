use time::Date;
use tracing::{info, warn};
use uuid::Uuid;

use super::dto::{AddExerciseRequest, DayBucket, WeekUnlocked, WeekView};
use super::flow::{summarize, validate_ratings, week_stage, week_stats, WeekStage};
use crate::calendar::{week_range, WeekRange, DAY_NAMES};
use crate::error::AppError;
use crate::exercises::dto::ExerciseView;
use crate::journey::engine::{ensure_week_open, ring_color, JOURNEY_WEEKS};
use crate::store::{Exercise, JourneyProgress, NewExercise, Store};

const MAX_NAME_LEN: usize = 120;

async fn active_journey(store: &dyn Store, user_id: Uuid) -> Result<JourneyProgress, AppError> {
    store
        .get_journey(user_id)
        .await?
        .filter(|j| j.has_weekly_goals())
        .ok_or_else(|| AppError::conflict("Set your weekly focus activities first"))
}

/// Start date for week arithmetic. Opening week 1 anchors it; later weeks without
/// an anchor fall back to `today` without persisting it.
async fn resolve_start(
    store: &dyn Store,
    journey: &JourneyProgress,
    week: i32,
    today: Date,
) -> Result<Date, AppError> {
    if let Some(start) = journey.journey_start_date {
        return Ok(start);
    }
    if week == 1 {
        let anchored = store.anchor_journey_start(journey.user_id, today).await?;
        info!(user_id = %journey.user_id, start = %anchored, "journey start anchored");
        return Ok(anchored);
    }
    warn!(user_id = %journey.user_id, week, "no journey start date; using today");
    Ok(today)
}

async fn week_exercises(store: &dyn Store, user_id: Uuid, range: &WeekRange) -> Vec<Exercise> {
    match store.list_exercises(user_id, range.start(), range.end()).await {
        Ok(ex) => ex,
        Err(e) => {
            warn!(error = %e, %user_id, week = range.week, "week exercises fetch failed");
            Vec::new()
        }
    }
}

pub async fn open_week(
    store: &dyn Store,
    user_id: Uuid,
    week: i32,
    today: Date,
) -> Result<WeekView, AppError> {
    let journey = active_journey(store, user_id).await?;
    ensure_week_open(&journey, week)?;

    let start = resolve_start(store, &journey, week, today).await?;
    let range = week_range(start, week);
    let exercises = week_exercises(store, user_id, &range).await;

    let summary = summarize(&range, &exercises);
    let stage = week_stage(&journey, &range, &exercises);
    let ring = journey
        .week_stats
        .get(&week)
        .filter(|_| stage == WeekStage::Completed)
        .map(|s| ring_color(s.missed_exercises));

    let mut days: Vec<DayBucket> = range
        .days
        .iter()
        .zip(DAY_NAMES)
        .map(|(date, day)| DayBucket {
            day,
            date: *date,
            exercises: Vec::new(),
        })
        .collect();
    for ex in exercises {
        if let Some(i) = range.day_index(ex.date) {
            days[i].exercises.push(ExerciseView::from(ex));
        }
    }

    Ok(WeekView {
        week,
        label: range.label(),
        start_date: range.start(),
        end_date: range.end(),
        destination: journey.ultimate_goal.clone(),
        weekly_focus: journey.weekly_goals.clone(),
        days,
        summary,
        read_only: stage == WeekStage::Completed,
        stage,
        ring,
    })
}

pub async fn add_exercise(
    store: &dyn Store,
    user_id: Uuid,
    week: i32,
    req: AddExerciseRequest,
    today: Date,
) -> Result<ExerciseView, AppError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Exercise name is required"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::validation(format!(
            "Exercise name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    if req.sets < 1 || req.reps < 1 {
        return Err(AppError::validation("Sets and reps must be at least 1"));
    }
    let duration = req.duration.unwrap_or(0);
    if duration < 0 {
        return Err(AppError::validation("Duration cannot be negative"));
    }
    let day = req.day.trim().to_uppercase();
    let Some(day_index) = DAY_NAMES.iter().position(|d| *d == day) else {
        return Err(AppError::validation("Day must be one of MON..SUN"));
    };

    let journey = active_journey(store, user_id).await?;
    ensure_week_open(&journey, week)?;
    if journey.is_week_completed(week) {
        return Err(AppError::forbidden(format!(
            "Week {week} is completed and read-only"
        )));
    }

    let start = resolve_start(store, &journey, week, today).await?;
    let date = week_range(start, week).days[day_index];
    let exercise = store
        .create_exercise(&NewExercise {
            user_id,
            name: name.to_string(),
            sets: req.sets,
            reps: req.reps,
            duration,
            date,
        })
        .await?;
    info!(%user_id, week, exercise_id = %exercise.id, %date, "exercise added");
    Ok(exercise.into())
}

/// Finishes the current week. Only one submission can win: the store refuses the
/// append once the week is recorded or the current week has moved on.
pub async fn complete_week(
    store: &dyn Store,
    user_id: Uuid,
    week: i32,
    ratings: &[Option<i32>],
    today: Date,
) -> Result<WeekUnlocked, AppError> {
    let goal_ratings = validate_ratings(ratings)?;

    let journey = active_journey(store, user_id).await?;
    ensure_week_open(&journey, week)?;
    if journey.is_week_completed(week) {
        return Err(AppError::conflict(format!("Week {week} is already completed")));
    }
    if week != journey.current_week {
        return Err(AppError::conflict(format!(
            "Only the current week ({}) can be completed",
            journey.current_week
        )));
    }

    let start = resolve_start(store, &journey, week, today).await?;
    let range = week_range(start, week);
    let exercises = store
        .list_exercises(user_id, range.start(), range.end())
        .await?;
    if week_stage(&journey, &range, &exercises) != WeekStage::Congratulations {
        return Err(AppError::conflict(
            "Finish every exercise on the last day of the week first",
        ));
    }

    let stats = week_stats(summarize(&range, &exercises), goal_ratings);
    let Some(saved) = store.record_week_completion(user_id, week, &stats).await? else {
        return Err(AppError::conflict(format!("Week {week} is already completed")));
    };

    let unlocked_week = Some(saved.current_week).filter(|w| *w <= JOURNEY_WEEKS);
    info!(
        %user_id,
        week,
        missed = stats.missed_exercises,
        ?unlocked_week,
        "week unlocked"
    );
    Ok(WeekUnlocked {
        completed_week: week,
        unlocked_week,
        ring: ring_color(stats.missed_exercises),
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercises::dto::CompleteSetRequest;
    use crate::exercises::services::complete_set;
    use crate::journey::services as journey;
    use crate::store::{MemoryStore, Profile};
    use time::{macros::date, OffsetDateTime};

    // Wednesday
    const TODAY: Date = date!(2026 - 01 - 07);

    async fn active_user() -> (MemoryStore, Uuid) {
        let store = MemoryStore::new();
        let user = store.create_user("pat@example.com", "Pat", "hash").await.unwrap();
        store
            .create_profile(&Profile::new(user.id, "Pat", OffsetDateTime::now_utc()))
            .await
            .unwrap();
        journey::set_destination(&store, user.id, "Back on the football pitch")
            .await
            .unwrap();
        journey::start_journey(&store, user.id).await.unwrap();
        let activities = vec![
            "Walk 5000 steps".to_string(),
            "Climb stairs".to_string(),
            "Squat 50kg".to_string(),
        ];
        journey::submit_weekly_goals(&store, user.id, &activities, TODAY)
            .await
            .unwrap();
        (store, user.id)
    }

    fn add(day: &str, name: &str, sets: i32) -> AddExerciseRequest {
        AddExerciseRequest {
            day: day.into(),
            name: name.into(),
            sets,
            reps: 15,
            duration: None,
        }
    }

    async fn finish(store: &MemoryStore, user_id: Uuid, ex: &ExerciseView) {
        for i in 0..ex.exercise.sets as usize {
            complete_set(
                store,
                user_id,
                ex.exercise.id,
                CompleteSetRequest {
                    index: i,
                    rating: 4,
                    comment: None,
                },
            )
            .await
            .unwrap();
        }
    }

    #[tokio::test]
    async fn first_visit_anchors_week_one() {
        let (store, user_id) = active_user().await;
        let view = open_week(&store, user_id, 1, TODAY).await.unwrap();
        assert_eq!(view.label, "Jan 5 - Jan 11, 2026");
        assert_eq!(view.days.len(), 7);
        assert_eq!(view.days[0].day, "MON");
        assert_eq!(view.stage, WeekStage::InProgress);

        // a later visit keeps the first anchor
        let later = open_week(&store, user_id, 1, date!(2026 - 01 - 20)).await.unwrap();
        assert_eq!(later.start_date, date!(2026 - 01 - 05));
        let profile = store.get_profile(user_id).await.unwrap().unwrap();
        assert_eq!(profile.journey_start_date, Some(TODAY));
    }

    #[tokio::test]
    async fn locked_and_out_of_range_weeks() {
        let (store, user_id) = active_user().await;
        assert!(matches!(
            open_week(&store, user_id, 2, TODAY).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            open_week(&store, user_id, 9, TODAY).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn exercise_lands_on_requested_day() {
        let (store, user_id) = active_user().await;
        let ex = add_exercise(&store, user_id, 1, add("wed", "Heel Slides", 3), TODAY)
            .await
            .unwrap();
        assert_eq!(ex.exercise.date, date!(2026 - 01 - 07));

        let view = open_week(&store, user_id, 1, TODAY).await.unwrap();
        assert_eq!(view.days[2].exercises.len(), 1);
        assert_eq!(view.summary.total, 1);

        assert!(matches!(
            add_exercise(&store, user_id, 1, add("XYZ", "Heel Slides", 3), TODAY).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            add_exercise(&store, user_id, 1, add("MON", "Heel Slides", 0), TODAY).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn week_completes_once_and_unlocks_next() {
        let (store, user_id) = active_user().await;
        let wed = add_exercise(&store, user_id, 1, add("WED", "Heel Slides", 3), TODAY)
            .await
            .unwrap();
        let sun = add_exercise(&store, user_id, 1, add("SUN", "Quad Sets", 2), TODAY)
            .await
            .unwrap();
        let ratings = [Some(5), Some(6), Some(7)];

        assert!(matches!(
            complete_week(&store, user_id, 1, &ratings, TODAY).await,
            Err(AppError::Conflict(_))
        ));

        finish(&store, user_id, &sun).await;
        let view = open_week(&store, user_id, 1, TODAY).await.unwrap();
        assert_eq!(view.stage, WeekStage::Congratulations);

        assert!(matches!(
            complete_week(&store, user_id, 1, &[Some(5), None, Some(7)], TODAY).await,
            Err(AppError::Validation(_))
        ));

        let unlocked = complete_week(&store, user_id, 1, &ratings, TODAY).await.unwrap();
        assert_eq!(unlocked.unlocked_week, Some(2));
        assert_eq!(unlocked.stats.total_exercises, 2);
        assert_eq!(unlocked.stats.missed_exercises, 1);
        assert_eq!(unlocked.ring, crate::journey::RingColor::Light);

        assert!(matches!(
            complete_week(&store, user_id, 1, &ratings, TODAY).await,
            Err(AppError::Conflict(_))
        ));
        let j = store.get_journey(user_id).await.unwrap().unwrap();
        assert_eq!(j.completed_weeks, vec![1]);
        assert_eq!(j.current_week, 2);
        assert_eq!(store.get_profile(user_id).await.unwrap().unwrap().current_week, 2);

        // week 1 is now read-only
        let view = open_week(&store, user_id, 1, TODAY).await.unwrap();
        assert!(view.read_only);
        assert_eq!(view.ring, Some(crate::journey::RingColor::Light));
        assert!(matches!(
            add_exercise(&store, user_id, 1, add("MON", "Bridges", 2), TODAY).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            complete_set(
                &store,
                user_id,
                wed.exercise.id,
                CompleteSetRequest {
                    index: 0,
                    rating: 3,
                    comment: None
                }
            )
            .await,
            Err(AppError::Forbidden(_))
        ));

        let week2 = open_week(&store, user_id, 2, TODAY).await.unwrap();
        assert_eq!(week2.label, "Jan 12 - Jan 18, 2026");
    }

    #[tokio::test]
    async fn racing_completions_record_one_week() {
        let (store, user_id) = active_user().await;
        let sun = add_exercise(&store, user_id, 1, add("SUN", "Quad Sets", 1), TODAY)
            .await
            .unwrap();
        finish(&store, user_id, &sun).await;

        let ratings = [Some(5), Some(6), Some(7)];
        let (a, b) = tokio::join!(
            complete_week(&store, user_id, 1, &ratings, TODAY),
            complete_week(&store, user_id, 1, &ratings, TODAY)
        );
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        let j = store.get_journey(user_id).await.unwrap().unwrap();
        assert_eq!(j.completed_weeks, vec![1]);
        assert_eq!(j.current_week, 2);
    }
}
