use time::Date;
use tracing::{info, warn};
use uuid::Uuid;

use super::dto::GoalsPage;
use crate::error::AppError;
use crate::store::{Goal, Store};

const MAX_TITLE_LEN: usize = 200;

/// Fetch failures degrade to an empty section.
pub async fn goals_page(store: &dyn Store, user_id: Uuid, date: Option<Date>) -> GoalsPage {
    let weekly_focus = match store.get_journey(user_id).await {
        Ok(j) => j.filter(|j| j.has_weekly_goals()).map(|j| j.weekly_goals),
        Err(e) => {
            warn!(error = %e, %user_id, "journey fetch failed");
            None
        }
    };
    let goals = store.list_goals(user_id, date).await.unwrap_or_else(|e| {
        warn!(error = %e, %user_id, "goals fetch failed");
        Vec::new()
    });
    GoalsPage {
        weekly_focus,
        goals,
    }
}

pub async fn create_goal(
    store: &dyn Store,
    user_id: Uuid,
    title: &str,
    date: Date,
) -> Result<Goal, AppError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::validation("Goal title is required"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::validation(format!(
            "Goal title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    let goal = store.create_goal(user_id, title, date).await?;
    info!(%user_id, goal_id = %goal.id, "goal created");
    Ok(goal)
}

pub async fn set_completed(
    store: &dyn Store,
    user_id: Uuid,
    id: Uuid,
    completed: bool,
) -> Result<Goal, AppError> {
    Ok(store.set_goal_completed(user_id, id, completed).await?)
}

pub async fn delete_goal(store: &dyn Store, user_id: Uuid, id: Uuid) -> Result<(), AppError> {
    store.delete_goal(user_id, id).await?;
    info!(%user_id, goal_id = %id, "goal deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use time::macros::date;

    #[tokio::test]
    async fn page_keeps_focus_and_checklist_apart() {
        let store = MemoryStore::new();
        let user_id = Uuid::new_v4();
        let page = goals_page(&store, user_id, None).await;
        assert!(page.weekly_focus.is_none());
        assert!(page.goals.is_empty());

        store
            .save_weekly_goals(
                user_id,
                "Run",
                &["Walk".into(), "Stairs".into(), "Squat".into()],
            )
            .await
            .unwrap();
        create_goal(&store, user_id, "Ice the knee", date!(2026 - 01 - 07))
            .await
            .unwrap();
        create_goal(&store, user_id, "Stretch", date!(2026 - 01 - 08))
            .await
            .unwrap();

        let page = goals_page(&store, user_id, Some(date!(2026 - 01 - 07))).await;
        assert_eq!(page.weekly_focus.unwrap()[1], "Stairs");
        assert_eq!(page.goals.len(), 1);
        assert_eq!(page.goals[0].title, "Ice the knee");
    }

    #[tokio::test]
    async fn page_degrades_when_reads_fail() {
        let store = MemoryStore::new();
        let user_id = Uuid::new_v4();
        create_goal(&store, user_id, "Stretch", date!(2026 - 01 - 07))
            .await
            .unwrap();
        store.fail_reads(true);
        let page = goals_page(&store, user_id, None).await;
        assert!(page.weekly_focus.is_none());
        assert!(page.goals.is_empty());
    }

    #[tokio::test]
    async fn toggle_and_delete() {
        let store = MemoryStore::new();
        let user_id = Uuid::new_v4();
        let goal = create_goal(&store, user_id, "Stretch", date!(2026 - 01 - 07))
            .await
            .unwrap();
        assert!(set_completed(&store, user_id, goal.id, true).await.unwrap().completed);

        assert!(matches!(
            delete_goal(&store, Uuid::new_v4(), goal.id).await,
            Err(AppError::NotFound(_))
        ));
        delete_goal(&store, user_id, goal.id).await.unwrap();
        assert!(store.list_goals(user_id, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_title_is_rejected() {
        let store = MemoryStore::new();
        assert!(matches!(
            create_goal(&store, Uuid::new_v4(), "  ", date!(2026 - 01 - 07)).await,
            Err(AppError::Validation(_))
        ));
    }
}
