use time::Date;
use tracing::{info, warn};
use uuid::Uuid;

use super::engine::{derive_state, JourneyState, Loaded};
use crate::auth::services::ensure_profile;
use crate::error::AppError;
use crate::store::{JourneyProgress, Profile, ProfilePatch, Store};

const MAX_DESTINATION_LEN: usize = 200;
const MAX_ACTIVITY_LEN: usize = 120;

/// Journey view for the page. A failed fetch renders `Loading` instead of an error.
pub async fn load_state(store: &dyn Store, user_id: Uuid) -> JourneyState {
    let profile = match store.get_profile(user_id).await {
        Ok(p) => Loaded::Ready(p),
        Err(e) => {
            warn!(error = %e, %user_id, "profile fetch failed");
            Loaded::Pending
        }
    };
    let journey = match store.get_journey(user_id).await {
        Ok(j) => Loaded::Ready(j),
        Err(e) => {
            warn!(error = %e, %user_id, "journey fetch failed");
            Loaded::Pending
        }
    };
    derive_state(true, as_ref(&profile), as_ref(&journey))
}

fn as_ref<T>(l: &Loaded<Option<T>>) -> Loaded<Option<&T>> {
    match l {
        Loaded::Pending => Loaded::Pending,
        Loaded::Ready(v) => Loaded::Ready(v.as_ref()),
    }
}

/// Records that writes depend on. Unlike [`load_state`], failures propagate.
async fn snapshot(
    store: &dyn Store,
    user_id: Uuid,
) -> Result<(Option<Profile>, Option<JourneyProgress>, JourneyState), AppError> {
    let profile = store.get_profile(user_id).await?;
    let journey = store.get_journey(user_id).await?;
    let state = derive_state(
        true,
        Loaded::Ready(profile.as_ref()),
        Loaded::Ready(journey.as_ref()),
    );
    Ok((profile, journey, state))
}

/// Onboarding: saves the ultimate goal on the profile. The journey document picks it
/// up when the weekly goals are submitted.
pub async fn set_destination(
    store: &dyn Store,
    user_id: Uuid,
    destination: &str,
) -> Result<JourneyState, AppError> {
    let destination = destination.trim();
    if destination.is_empty() {
        return Err(AppError::validation("Destination cannot be empty"));
    }
    if destination.chars().count() > MAX_DESTINATION_LEN {
        return Err(AppError::validation(format!(
            "Destination must be at most {MAX_DESTINATION_LEN} characters"
        )));
    }

    let (profile, _, state) = snapshot(store, user_id).await?;
    if !matches!(state, JourneyState::Onboarding | JourneyState::ReadyToStart { .. }) {
        return Err(AppError::conflict(
            "Journey already started; change the destination from your profile",
        ));
    }
    if profile.is_none() {
        let user = store
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;
        ensure_profile(store, &user).await?;
    }

    store
        .update_profile(
            user_id,
            &ProfilePatch {
                ultimate_goal: Some(destination.to_string()),
                ..Default::default()
            },
        )
        .await?;
    info!(%user_id, "journey destination set");

    Ok(snapshot(store, user_id).await?.2)
}

/// ReadyToStart -> WeeklySetup. The flag is persisted so a reload resumes setup.
pub async fn start_journey(store: &dyn Store, user_id: Uuid) -> Result<JourneyState, AppError> {
    let (_, _, state) = snapshot(store, user_id).await?;
    match state {
        JourneyState::ReadyToStart { .. } => {}
        JourneyState::WeeklySetup { .. } => return Ok(state),
        other => {
            return Err(AppError::conflict(format!(
                "Cannot start the journey from {}",
                other.name()
            )))
        }
    }

    store
        .update_profile(
            user_id,
            &ProfilePatch {
                journey_started: Some(true),
                ..Default::default()
            },
        )
        .await?;
    info!(%user_id, "journey started");
    Ok(snapshot(store, user_id).await?.2)
}

/// WeeklySetup -> ActiveRoadmap. Saves the three activities on the journey and also
/// records them as dated legacy goals; a failed legacy insert is only logged.
pub async fn submit_weekly_goals(
    store: &dyn Store,
    user_id: Uuid,
    activities: &[String],
    today: Date,
) -> Result<JourneyState, AppError> {
    let goals = normalize_activities(activities)?;

    let (profile, _, state) = snapshot(store, user_id).await?;
    let JourneyState::WeeklySetup { .. } = state else {
        return Err(AppError::conflict(format!(
            "Weekly goals cannot be set from {}",
            state.name()
        )));
    };
    let destination = profile
        .map(|p| p.ultimate_goal.trim().to_string())
        .unwrap_or_default();

    store.save_weekly_goals(user_id, &destination, &goals).await?;
    info!(%user_id, "weekly goals saved");

    for title in &goals {
        if let Err(e) = store.create_goal(user_id, title, today).await {
            warn!(error = %e, %user_id, "legacy goal insert failed");
        }
    }

    Ok(snapshot(store, user_id).await?.2)
}

fn normalize_activities(activities: &[String]) -> Result<[String; 3], AppError> {
    let trimmed: Vec<String> = activities.iter().map(|a| a.trim().to_string()).collect();
    let Ok(goals) = <[String; 3]>::try_from(trimmed) else {
        return Err(AppError::validation("Exactly three activities are required"));
    };
    if goals.iter().any(|g| g.is_empty()) {
        return Err(AppError::validation("Activities cannot be empty"));
    }
    if goals.iter().any(|g| g.chars().count() > MAX_ACTIVITY_LEN) {
        return Err(AppError::validation(format!(
            "Activities must be at most {MAX_ACTIVITY_LEN} characters"
        )));
    }
    Ok(goals)
}
