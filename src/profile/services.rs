use tracing::{error, info, warn};
use uuid::Uuid;

use super::dto::{ResetReport, UpdateProfileRequest};
use crate::auth::services::ensure_profile;
use crate::error::AppError;
use crate::store::{Profile, ProfilePatch, Store, StoreError};

const MAX_FIELD_LEN: usize = 200;

fn bounded(field: &str, value: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.chars().count() > MAX_FIELD_LEN {
        return Err(AppError::validation(format!(
            "{field} must be at most {MAX_FIELD_LEN} characters"
        )));
    }
    Ok(value.to_string())
}

pub async fn get_profile(store: &dyn Store, user_id: Uuid) -> Result<Profile, AppError> {
    let user = store
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;
    ensure_profile(store, &user).await
}

/// Name, patient id and destination edits. A new destination is mirrored onto
/// the journey document so both always agree.
pub async fn update_profile(
    store: &dyn Store,
    user_id: Uuid,
    req: UpdateProfileRequest,
) -> Result<Profile, AppError> {
    let mut patch = ProfilePatch::default();
    if let Some(name) = req.name.as_deref() {
        let name = bounded("Name", name)?;
        if name.is_empty() {
            return Err(AppError::validation("Name cannot be empty"));
        }
        patch.name = Some(name);
    }
    if let Some(pid) = req.patient_id.as_deref() {
        patch.patient_id = Some(bounded("Patient ID", pid)?);
    }
    if let Some(goal) = req.ultimate_goal.as_deref() {
        let goal = bounded("Destination", goal)?;
        if goal.is_empty() {
            return Err(AppError::validation("Destination cannot be empty"));
        }
        patch.ultimate_goal = Some(goal);
    }

    get_profile(store, user_id).await?;
    let profile = store.update_profile(user_id, &patch).await?;
    if let Some(goal) = &patch.ultimate_goal {
        store.set_journey_destination(user_id, goal).await?;
    }
    info!(%user_id, "profile updated");
    Ok(profile)
}

/// Deletes exercises, the journey and legacy goals, then puts the profile back
/// to its defaults. Each step is idempotent, so re-running after a partial
/// failure finishes the job.
pub async fn reset_data(store: &dyn Store, user_id: Uuid) -> Result<ResetReport, AppError> {
    let mut report = ResetReport::default();

    report.exercises_deleted = step(store.delete_exercises(user_id).await, user_id, "exercises")?;
    report.journey_deleted = step(store.delete_journey(user_id).await, user_id, "journey")?;
    report.goals_deleted = step(store.delete_goals(user_id).await, user_id, "goals")?;

    report.profile_reset = match store.update_profile(user_id, &ProfilePatch::reset()).await {
        Ok(_) => true,
        Err(StoreError::NotFound(_)) => {
            warn!(%user_id, "no profile to reset");
            false
        }
        Err(e) => {
            error!(error = %e, %user_id, step = "profile", "reset step failed");
            return Err(e.into());
        }
    };

    info!(
        %user_id,
        exercises = report.exercises_deleted,
        goals = report.goals_deleted,
        journey = report.journey_deleted,
        "user data reset"
    );
    Ok(report)
}

fn step<T>(res: Result<T, StoreError>, user_id: Uuid, what: &'static str) -> Result<T, AppError> {
    res.map_err(|e| {
        error!(error = %e, %user_id, step = what, "reset step failed");
        AppError::from(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journey::services as journey;
    use crate::store::{MemoryStore, NewExercise};
    use time::{macros::date, OffsetDateTime};

    async fn seeded() -> (MemoryStore, Uuid) {
        let store = MemoryStore::new();
        let user = store.create_user("pat@example.com", "Pat", "hash").await.unwrap();
        store
            .create_profile(&Profile::new(user.id, "Pat", OffsetDateTime::now_utc()))
            .await
            .unwrap();
        (store, user.id)
    }

    async fn with_journey_and_five_exercises() -> (MemoryStore, Uuid) {
        let (store, user_id) = seeded().await;
        journey::set_destination(&store, user_id, "Run").await.unwrap();
        journey::start_journey(&store, user_id).await.unwrap();
        let acts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        journey::submit_weekly_goals(&store, user_id, &acts, date!(2026 - 01 - 07))
            .await
            .unwrap();
        store
            .anchor_journey_start(user_id, date!(2026 - 01 - 07))
            .await
            .unwrap();
        for i in 0..5 {
            store
                .create_exercise(&NewExercise {
                    user_id,
                    name: format!("Exercise {i}"),
                    sets: 3,
                    reps: 10,
                    duration: 0,
                    date: date!(2026 - 01 - 07),
                })
                .await
                .unwrap();
        }
        (store, user_id)
    }

    #[tokio::test]
    async fn reset_clears_everything() {
        let (store, user_id) = with_journey_and_five_exercises().await;

        let report = reset_data(&store, user_id).await.unwrap();
        assert_eq!(report.exercises_deleted, 5);
        assert!(report.journey_deleted);
        assert_eq!(report.goals_deleted, 3);

        let profile = store.get_profile(user_id).await.unwrap().unwrap();
        assert_eq!(profile.current_week, 1);
        assert_eq!(profile.ultimate_goal, "");
        assert!(!profile.journey_started);
        assert_eq!(profile.journey_start_date, None);
        assert!(store.get_journey(user_id).await.unwrap().is_none());
        let left = store
            .list_exercises(user_id, date!(2000 - 01 - 01), date!(2100 - 01 - 01))
            .await
            .unwrap();
        assert!(left.is_empty());
    }

    #[tokio::test]
    async fn reset_can_be_rerun_after_failure() {
        let (store, user_id) = with_journey_and_five_exercises().await;
        store.fail_writes(true);
        assert!(reset_data(&store, user_id).await.unwrap_err().is_retryable());
        store.fail_writes(false);

        reset_data(&store, user_id).await.unwrap();
        let again = reset_data(&store, user_id).await.unwrap();
        assert_eq!(
            again,
            ResetReport {
                profile_reset: true,
                ..Default::default()
            }
        );
    }

    #[tokio::test]
    async fn destination_edit_is_mirrored_to_journey() {
        let (store, user_id) = with_journey_and_five_exercises().await;
        let profile = update_profile(
            &store,
            user_id,
            UpdateProfileRequest {
                ultimate_goal: Some(" Hike again ".into()),
                patient_id: Some("P-001".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(profile.ultimate_goal, "Hike again");
        assert_eq!(profile.patient_id, "P-001");
        let j = store.get_journey(user_id).await.unwrap().unwrap();
        assert_eq!(j.ultimate_goal, "Hike again");
    }

    #[tokio::test]
    async fn blank_edits_are_rejected() {
        let (store, user_id) = seeded().await;
        for req in [
            UpdateProfileRequest {
                name: Some("  ".into()),
                ..Default::default()
            },
            UpdateProfileRequest {
                ultimate_goal: Some("".into()),
                ..Default::default()
            },
        ] {
            assert!(matches!(
                update_profile(&store, user_id, req).await,
                Err(AppError::Validation(_))
            ));
        }
    }
}
