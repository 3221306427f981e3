//! Journey state machine.
//!
//! The view state is never stored. It is recomputed on every request from the
//! profile and journey records, so it cannot drift from what the database holds.

use serde::Serialize;
use tracing::warn;

use crate::error::AppError;
use crate::store::{JourneyProgress, Profile};

/// Number of week slots on the roadmap.
pub const JOURNEY_WEEKS: i32 = 8;

/// A record that may still be in flight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Loaded<T> {
    Pending,
    Ready(T),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JourneyState {
    /// Records not available yet; render a spinner, not a guess.
    Loading,
    /// No destination chosen.
    Onboarding,
    ReadyToStart { destination: String },
    /// Waiting for the three weekly focus activities.
    WeeklySetup { destination: String },
    ActiveRoadmap(Roadmap),
}

impl JourneyState {
    pub fn name(&self) -> &'static str {
        match self {
            JourneyState::Loading => "loading",
            JourneyState::Onboarding => "onboarding",
            JourneyState::ReadyToStart { .. } => "ready_to_start",
            JourneyState::WeeklySetup { .. } => "weekly_setup",
            JourneyState::ActiveRoadmap(_) => "active_roadmap",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Roadmap {
    pub destination: String,
    pub current_week: i32,
    pub weekly_focus: [String; 3],
    pub weeks: Vec<WeekSlot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekSlot {
    pub week: i32,
    #[serde(flatten)]
    pub status: WeekStatus,
    pub selectable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WeekStatus {
    Locked,
    Complete { ring: Option<RingColor> },
    Active,
    Available,
}

impl WeekStatus {
    pub fn is_locked(&self) -> bool {
        matches!(self, WeekStatus::Locked)
    }

    #[cfg(test)]
    fn is_complete(&self) -> bool {
        matches!(self, WeekStatus::Complete { .. })
    }
}

/// Badge color of a finished week, derived from how many exercises were missed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RingColor {
    Strong,
    Light,
    Caution,
    Warning,
    Alert,
}

pub fn ring_color(missed: u32) -> RingColor {
    match missed {
        0 => RingColor::Strong,
        1 => RingColor::Light,
        2 => RingColor::Caution,
        3 => RingColor::Warning,
        _ => RingColor::Alert,
    }
}

/// Locked iff `week > current_week`. A locked week is never reported complete,
/// even if the completed list disagrees.
pub fn week_status(week: i32, current_week: i32, completed_weeks: &[i32]) -> WeekStatus {
    if week > current_week {
        if completed_weeks.contains(&week) {
            warn!(week, current_week, "completed week is ahead of current week");
        }
        return WeekStatus::Locked;
    }
    if completed_weeks.contains(&week) {
        return WeekStatus::Complete { ring: None };
    }
    if week == current_week {
        WeekStatus::Active
    } else {
        WeekStatus::Available
    }
}

pub fn roadmap(journey: &JourneyProgress, destination: &str) -> Roadmap {
    let weeks = (1..=JOURNEY_WEEKS)
        .map(|week| {
            let status = match week_status(week, journey.current_week, &journey.completed_weeks) {
                WeekStatus::Complete { .. } => WeekStatus::Complete {
                    ring: journey
                        .week_stats
                        .get(&week)
                        .map(|s| ring_color(s.missed_exercises)),
                },
                other => other,
            };
            WeekSlot {
                week,
                selectable: !status.is_locked(),
                status,
            }
        })
        .collect();
    Roadmap {
        destination: destination.to_string(),
        current_week: journey.current_week,
        weekly_focus: journey.weekly_goals.clone(),
        weeks,
    }
}

/// Pure derivation of the journey view from the latest records.
pub fn derive_state(
    authenticated: bool,
    profile: Loaded<Option<&Profile>>,
    journey: Loaded<Option<&JourneyProgress>>,
) -> JourneyState {
    if !authenticated {
        return JourneyState::Loading;
    }
    let (Loaded::Ready(profile), Loaded::Ready(journey)) = (profile, journey) else {
        return JourneyState::Loading;
    };

    let Some(profile) = profile.filter(|p| p.has_destination()) else {
        return JourneyState::Onboarding;
    };
    let destination = profile.ultimate_goal.trim().to_string();

    match journey.filter(|j| j.has_weekly_goals()) {
        Some(j) => JourneyState::ActiveRoadmap(roadmap(j, &destination)),
        None if profile.journey_started => JourneyState::WeeklySetup { destination },
        None => JourneyState::ReadyToStart { destination },
    }
}

/// Week numbers outside the roadmap or beyond the current week cannot be opened.
pub fn ensure_week_open(journey: &JourneyProgress, week: i32) -> Result<(), AppError> {
    if !(1..=JOURNEY_WEEKS).contains(&week) {
        return Err(AppError::NotFound("week"));
    }
    if week_status(week, journey.current_week, &journey.completed_weeks).is_locked() {
        return Err(AppError::forbidden(format!("Week {week} is locked")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::WeekStats;
    use std::collections::BTreeMap;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn profile(goal: &str, started: bool) -> Profile {
        let mut p = Profile::new(Uuid::new_v4(), "Pat", OffsetDateTime::now_utc());
        p.ultimate_goal = goal.into();
        p.journey_started = started;
        p
    }

    fn journey(current_week: i32, completed: Vec<i32>) -> JourneyProgress {
        let now = OffsetDateTime::now_utc();
        JourneyProgress {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            ultimate_goal: "Back on the football pitch".into(),
            current_week,
            completed_weeks: completed,
            weekly_goals: ["Walk 5000 steps".into(), "Climb stairs".into(), "Squat 50kg".into()],
            week_stats: BTreeMap::new(),
            journey_start_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn pending_records_render_loading() {
        let p = profile("Run", false);
        assert_eq!(
            derive_state(true, Loaded::Pending, Loaded::Ready(None)),
            JourneyState::Loading
        );
        assert_eq!(
            derive_state(true, Loaded::Ready(Some(&p)), Loaded::Pending),
            JourneyState::Loading
        );
        assert_eq!(
            derive_state(false, Loaded::Ready(Some(&p)), Loaded::Ready(None)),
            JourneyState::Loading
        );
    }

    #[test]
    fn blank_goal_is_onboarding() {
        let p = profile("   ", true);
        assert_eq!(
            derive_state(true, Loaded::Ready(Some(&p)), Loaded::Ready(None)),
            JourneyState::Onboarding
        );
        assert_eq!(
            derive_state(true, Loaded::Ready(None), Loaded::Ready(None)),
            JourneyState::Onboarding
        );
    }

    #[test]
    fn destination_without_weekly_goals() {
        let p = profile("Back on the football pitch", false);
        assert_eq!(
            derive_state(true, Loaded::Ready(Some(&p)), Loaded::Ready(None)),
            JourneyState::ReadyToStart {
                destination: "Back on the football pitch".into()
            }
        );

        let started = profile("Back on the football pitch", true);
        let mut empty = journey(1, vec![]);
        empty.weekly_goals[2] = String::new();
        assert_eq!(
            derive_state(true, Loaded::Ready(Some(&started)), Loaded::Ready(Some(&empty))),
            JourneyState::WeeklySetup {
                destination: "Back on the football pitch".into()
            }
        );
    }

    #[test]
    fn weekly_goals_show_roadmap_with_week_one_active() {
        let p = profile("Back on the football pitch", true);
        let j = journey(1, vec![]);
        let JourneyState::ActiveRoadmap(map) =
            derive_state(true, Loaded::Ready(Some(&p)), Loaded::Ready(Some(&j)))
        else {
            panic!("expected roadmap");
        };
        assert_eq!(map.weeks.len(), 8);
        assert_eq!(map.weeks[0].status, WeekStatus::Active);
        assert!(map.weeks[1..].iter().all(|w| w.status == WeekStatus::Locked && !w.selectable));
    }

    #[test]
    fn locked_iff_beyond_current_and_never_both() {
        for current in 1..=9 {
            let completed: Vec<i32> = (1..current).chain([current + 1]).collect();
            for n in 1..=JOURNEY_WEEKS {
                let s = week_status(n, current, &completed);
                assert_eq!(s.is_locked(), n > current, "week {n} current {current}");
                assert!(!(s.is_locked() && s.is_complete()));
            }
        }
    }

    #[test]
    fn ring_color_depends_only_on_missed() {
        assert_eq!(ring_color(0), RingColor::Strong);
        assert_eq!(ring_color(1), RingColor::Light);
        assert_eq!(ring_color(2), RingColor::Caution);
        assert_eq!(ring_color(3), RingColor::Warning);
        assert_eq!(ring_color(4), RingColor::Alert);
        assert_eq!(ring_color(40), RingColor::Alert);
        assert_eq!(ring_color(2), ring_color(2));
    }

    #[test]
    fn completed_weeks_carry_ring_from_stats() {
        let mut j = journey(3, vec![1, 2]);
        j.week_stats.insert(
            1,
            WeekStats {
                total_exercises: 5,
                completed_exercises: 3,
                missed_exercises: 2,
                goal_ratings: [4, 5, 6],
            },
        );
        let map = roadmap(&j, "Run");
        assert_eq!(
            map.weeks[0].status,
            WeekStatus::Complete {
                ring: Some(RingColor::Caution)
            }
        );
        assert_eq!(map.weeks[1].status, WeekStatus::Complete { ring: None });
        assert_eq!(map.weeks[2].status, WeekStatus::Active);
        assert!(map.weeks[0].selectable);
    }

    #[test]
    fn week_open_checks() {
        let j = journey(2, vec![1]);
        assert!(ensure_week_open(&j, 1).is_ok());
        assert!(ensure_week_open(&j, 2).is_ok());
        assert!(matches!(ensure_week_open(&j, 3), Err(AppError::Forbidden(_))));
        assert!(matches!(ensure_week_open(&j, 0), Err(AppError::NotFound(_))));
        assert!(matches!(ensure_week_open(&j, 9), Err(AppError::NotFound(_))));
    }

    #[test]
    fn roadmap_serializes_with_tags() {
        let p = profile("Run", true);
        let j = journey(1, vec![]);
        let state = derive_state(true, Loaded::Ready(Some(&p)), Loaded::Ready(Some(&j)));
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["state"], "active_roadmap");
        assert_eq!(json["weeks"][0]["status"], "active");
        assert_eq!(json["weeks"][1]["status"], "locked");
    }
}
