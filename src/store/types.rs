use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::calendar::iso_date;
use crate::exercises::model::CompletedSet;

/// Account record.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // argon2 PHC string
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A live login. Tokens carry its id, logout deletes it.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub user_id: Uuid,
    pub name: String,
    pub patient_id: String,
    pub ultimate_goal: String,
    pub current_week: i32,
    pub journey_started: bool,
    #[serde(with = "iso_date::option")]
    pub journey_start_date: Option<Date>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Profile {
    pub fn new(user_id: Uuid, name: &str, now: OffsetDateTime) -> Self {
        Self {
            user_id,
            name: name.to_string(),
            patient_id: String::new(),
            ultimate_goal: String::new(),
            current_week: 1,
            journey_started: false,
            journey_start_date: None,
            created_at: now,
        }
    }

    pub fn has_destination(&self) -> bool {
        !self.ultimate_goal.trim().is_empty()
    }
}

/// Partial profile update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub patient_id: Option<String>,
    pub ultimate_goal: Option<String>,
    pub current_week: Option<i32>,
    pub journey_started: Option<bool>,
    pub journey_start_date: Option<Option<Date>>,
}

impl ProfilePatch {
    pub fn apply(&self, p: &mut Profile) {
        if let Some(v) = &self.name {
            p.name = v.clone();
        }
        if let Some(v) = &self.patient_id {
            p.patient_id = v.clone();
        }
        if let Some(v) = &self.ultimate_goal {
            p.ultimate_goal = v.clone();
        }
        if let Some(v) = self.current_week {
            p.current_week = v;
        }
        if let Some(v) = self.journey_started {
            p.journey_started = v;
        }
        if let Some(v) = self.journey_start_date {
            p.journey_start_date = v;
        }
    }

    /// Values a data reset puts back.
    pub fn reset() -> Self {
        Self {
            ultimate_goal: Some(String::new()),
            current_week: Some(1),
            journey_started: Some(false),
            journey_start_date: Some(None),
            ..Default::default()
        }
    }
}

/// Outcome of one finished week, keyed by week number inside [`JourneyProgress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekStats {
    pub total_exercises: u32,
    pub completed_exercises: u32,
    pub missed_exercises: u32,
    /// 0 = unable to perform, 10 = prior level; one per weekly focus activity.
    pub goal_ratings: [u8; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JourneyProgress {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ultimate_goal: String,
    pub current_week: i32,
    pub completed_weeks: Vec<i32>,
    pub weekly_goals: [String; 3],
    pub week_stats: BTreeMap<i32, WeekStats>,
    #[serde(with = "iso_date::option")]
    pub journey_start_date: Option<Date>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl JourneyProgress {
    pub fn has_weekly_goals(&self) -> bool {
        self.weekly_goals.iter().all(|g| !g.trim().is_empty())
    }

    pub fn is_week_completed(&self, week: i32) -> bool {
        self.completed_weeks.contains(&week)
    }
}

#[derive(Debug, Clone)]
pub struct NewExercise {
    pub user_id: Uuid,
    pub name: String,
    pub sets: i32,
    pub reps: i32,
    pub duration: i32,
    pub date: Date,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Exercise {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub sets: i32,
    pub reps: i32,
    pub duration: i32,
    #[serde(with = "iso_date")]
    pub date: Date,
    pub completed: bool,
    pub completed_sets: Vec<CompletedSet>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Goal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub completed: bool,
    #[serde(with = "iso_date")]
    pub date: Date,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
