//! Read models for the dashboard, progress, diary and help pages. Every fetch
//! here degrades to an empty section rather than failing the page.

use std::collections::BTreeMap;

use time::{Date, Duration};
use tracing::warn;
use uuid::Uuid;

use super::dto::{
    ActivityRating, Dashboard, Diary, DiaryDay, HelpSection, ProgressPage, WeekProgress,
};
use super::stats::{active_days, day_streak, percent};
use crate::calendar::week_range;
use crate::error::AppError;
use crate::exercises::dto::ExerciseView;
use crate::exercises::services::check_range;
use crate::journey::engine::ring_color;
use crate::store::{Exercise, JourneyProgress, Profile, Store};
use crate::week::flow::summarize;

const HISTORY_DAYS: i64 = 366;
const DIARY_DEFAULT_DAYS: i64 = 7;

async fn profile_or_none(store: &dyn Store, user_id: Uuid) -> Option<Profile> {
    store.get_profile(user_id).await.unwrap_or_else(|e| {
        warn!(error = %e, %user_id, "profile fetch failed");
        None
    })
}

async fn journey_or_none(store: &dyn Store, user_id: Uuid) -> Option<JourneyProgress> {
    store.get_journey(user_id).await.unwrap_or_else(|e| {
        warn!(error = %e, %user_id, "journey fetch failed");
        None
    })
}

async fn exercises_or_empty(store: &dyn Store, user_id: Uuid, from: Date, to: Date) -> Vec<Exercise> {
    store
        .list_exercises(user_id, from, to)
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, %user_id, "exercise fetch failed");
            Vec::new()
        })
}

fn destination(profile: Option<&Profile>) -> Option<String> {
    profile
        .filter(|p| p.has_destination())
        .map(|p| p.ultimate_goal.trim().to_string())
}

pub async fn dashboard(store: &dyn Store, user_id: Uuid, today: Date) -> Dashboard {
    let profile = profile_or_none(store, user_id).await;
    let journey = journey_or_none(store, user_id).await;

    let from = journey
        .as_ref()
        .and_then(|j| j.journey_start_date)
        .filter(|d| *d <= today)
        .unwrap_or_else(|| today.saturating_sub(Duration::days(HISTORY_DAYS)));
    let history = exercises_or_empty(store, user_id, from, today).await;

    let todays: Vec<&Exercise> = history.iter().filter(|e| e.date == today).collect();
    let active = active_days(&history);

    let current_week = journey
        .as_ref()
        .map(|j| j.current_week)
        .or(profile.as_ref().map(|p| p.current_week))
        .unwrap_or(1);

    let week_progress_percent = match journey.as_ref().and_then(|j| j.journey_start_date) {
        Some(start) => {
            let range = week_range(start, current_week);
            let week = exercises_or_empty(store, user_id, range.start(), range.end()).await;
            let s = summarize(&range, &week);
            percent(s.completed, s.total)
        }
        None => 0,
    };

    Dashboard {
        destination: destination(profile.as_ref()),
        current_week,
        today_completed: todays.iter().filter(|e| e.is_complete()).count() as u32,
        today_total: todays.len() as u32,
        day_streak: day_streak(&active, today),
        days_active: active.len() as u32,
        week_progress_percent,
    }
}

pub async fn progress(store: &dyn Store, user_id: Uuid) -> ProgressPage {
    let profile = profile_or_none(store, user_id).await;
    let Some(journey) = journey_or_none(store, user_id).await else {
        return ProgressPage {
            destination: destination(profile.as_ref()),
            current_week: profile.as_ref().map_or(1, |p| p.current_week),
            ..Default::default()
        };
    };

    let mut done = 0;
    let mut total = 0;
    let mut weeks = Vec::new();
    for (&week, stats) in &journey.week_stats {
        if !journey.is_week_completed(week) {
            continue;
        }
        done += stats.completed_exercises;
        total += stats.total_exercises;
        weeks.push(WeekProgress {
            week,
            label: journey
                .journey_start_date
                .map(|start| week_range(start, week).label()),
            stats: *stats,
            ring: ring_color(stats.missed_exercises),
            completion_percent: percent(stats.completed_exercises, stats.total_exercises),
            ratings: journey
                .weekly_goals
                .iter()
                .zip(stats.goal_ratings)
                .map(|(activity, rating)| ActivityRating {
                    activity: activity.clone(),
                    rating,
                })
                .collect(),
        });
    }

    ProgressPage {
        destination: destination(profile.as_ref()),
        current_week: journey.current_week,
        weeks_completed: weeks.len() as u32,
        overall_completion_percent: percent(done, total),
        weeks,
    }
}

/// Exercises grouped by day over `from..=to`, defaulting to the last seven days.
pub async fn diary(
    store: &dyn Store,
    user_id: Uuid,
    from: Option<Date>,
    to: Option<Date>,
    today: Date,
) -> Result<Diary, AppError> {
    let to = to.unwrap_or(today);
    let from = from.unwrap_or_else(|| to.saturating_sub(Duration::days(DIARY_DEFAULT_DAYS - 1)));
    check_range(from, to)?;

    let mut by_day: BTreeMap<Date, Vec<ExerciseView>> = BTreeMap::new();
    for ex in exercises_or_empty(store, user_id, from, to).await {
        by_day.entry(ex.date).or_default().push(ex.into());
    }
    let days = by_day
        .into_iter()
        .rev()
        .map(|(date, exercises)| DiaryDay { date, exercises })
        .collect();

    Ok(Diary { from, to, days })
}

pub fn help() -> Vec<HelpSection> {
    vec![
        HelpSection {
            title: "Your destination",
            body: "Start by describing the outcome you are working towards, for example getting back on the football pitch. You can change it later from your profile.",
        },
        HelpSection {
            title: "Weekly focus",
            body: "Pick three activities that matter for your recovery. At the end of every week you rate each one from 0 (unable to perform) to 10 (back to your prior level).",
        },
        HelpSection {
            title: "The 8-week roadmap",
            body: "Weeks unlock one at a time. Finish every exercise planned for the last day of the week, rate your focus activities and the next week opens.",
        },
        HelpSection {
            title: "Logging sets",
            body: "Complete sets in order and rate how each one felt from 1 to 5. A comment is optional. Finished weeks are read-only.",
        },
        HelpSection {
            title: "Week rings",
            body: "A finished week shows a ring colored by how many exercises were missed: none, one, two, three, or four and more.",
        },
        HelpSection {
            title: "Starting over",
            body: "Reset your data from the profile page. It removes your journey and all exercises. If it is interrupted, run it again to finish.",
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercises::model::CompletedSet;
    use crate::store::{MemoryStore, NewExercise, WeekStats};
    use time::{macros::date, OffsetDateTime};

    const TODAY: Date = date!(2026 - 01 - 07);

    async fn exercise(store: &MemoryStore, user_id: Uuid, date: Date, finish: bool) {
        let ex = store
            .create_exercise(&NewExercise {
                user_id,
                name: "Bridges".into(),
                sets: 1,
                reps: 10,
                duration: 0,
                date,
            })
            .await
            .unwrap();
        if finish {
            let sets = [CompletedSet {
                rating: 4,
                comment: None,
            }];
            store
                .save_completed_sets(user_id, ex.id, 0, &sets, true)
                .await
                .unwrap();
        }
    }

    async fn active_user() -> (MemoryStore, Uuid) {
        let store = MemoryStore::new();
        let user = store.create_user("pat@example.com", "Pat", "hash").await.unwrap();
        let mut p = Profile::new(user.id, "Pat", OffsetDateTime::now_utc());
        p.ultimate_goal = "Run".into();
        store.create_profile(&p).await.unwrap();
        store
            .save_weekly_goals(user.id, "Run", &["Walk".into(), "Stairs".into(), "Squat".into()])
            .await
            .unwrap();
        store.anchor_journey_start(user.id, date!(2026 - 01 - 05)).await.unwrap();
        (store, user.id)
    }

    #[tokio::test]
    async fn dashboard_counts_today_and_streak() {
        let (store, user_id) = active_user().await;
        exercise(&store, user_id, date!(2026 - 01 - 05), true).await;
        exercise(&store, user_id, date!(2026 - 01 - 06), true).await;
        exercise(&store, user_id, TODAY, true).await;
        exercise(&store, user_id, TODAY, false).await;

        let d = dashboard(&store, user_id, TODAY).await;
        assert_eq!(d.destination.as_deref(), Some("Run"));
        assert_eq!(d.today_total, 2);
        assert_eq!(d.today_completed, 1);
        assert_eq!(d.day_streak, 3);
        assert_eq!(d.days_active, 3);
        assert_eq!(d.week_progress_percent, 75);
    }

    #[tokio::test]
    async fn dashboard_for_new_user_is_empty() {
        let store = MemoryStore::new();
        let d = dashboard(&store, Uuid::new_v4(), TODAY).await;
        assert_eq!(d.today_total, 0);
        assert_eq!(d.current_week, 1);
        assert_eq!(d.destination, None);
    }

    #[tokio::test]
    async fn dashboard_degrades_when_reads_fail() {
        let (store, user_id) = active_user().await;
        exercise(&store, user_id, TODAY, true).await;
        store.fail_reads(true);

        let d = dashboard(&store, user_id, TODAY).await;
        assert_eq!(d.destination, None);
        assert_eq!(d.current_week, 1);
        assert_eq!(d.today_total, 0);
        assert_eq!(d.days_active, 0);
        assert_eq!(d.week_progress_percent, 0);
    }

    #[tokio::test]
    async fn progress_lists_completed_weeks() {
        let (store, user_id) = active_user().await;
        let stats = WeekStats {
            total_exercises: 4,
            completed_exercises: 3,
            missed_exercises: 1,
            goal_ratings: [3, 4, 5],
        };
        store.record_week_completion(user_id, 1, &stats).await.unwrap();

        let p = progress(&store, user_id).await;
        assert_eq!(p.current_week, 2);
        assert_eq!(p.weeks_completed, 1);
        assert_eq!(p.overall_completion_percent, 75);
        let w = &p.weeks[0];
        assert_eq!(w.label.as_deref(), Some("Jan 5 - Jan 11, 2026"));
        assert_eq!(w.ring, crate::journey::RingColor::Light);
        assert_eq!(w.ratings[2].activity, "Squat");
        assert_eq!(w.ratings[2].rating, 5);
    }

    #[tokio::test]
    async fn diary_defaults_to_last_week_newest_first() {
        let (store, user_id) = active_user().await;
        exercise(&store, user_id, date!(2025 - 12 - 31), true).await;
        exercise(&store, user_id, date!(2026 - 01 - 01), true).await;
        exercise(&store, user_id, TODAY, false).await;

        let d = diary(&store, user_id, None, None, TODAY).await.unwrap();
        assert_eq!(d.from, date!(2026 - 01 - 01));
        assert_eq!(d.days.len(), 2);
        assert_eq!(d.days[0].date, TODAY);

        assert!(diary(&store, user_id, Some(TODAY), Some(date!(2026 - 01 - 01)), TODAY)
            .await
            .is_err());
    }
}
