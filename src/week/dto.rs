use serde::{Deserialize, Serialize};
use time::Date;

use super::flow::{WeekStage, WeekSummary};
use crate::calendar::iso_date;
use crate::exercises::dto::ExerciseView;
use crate::journey::RingColor;
use crate::store::WeekStats;

#[derive(Debug, Serialize)]
pub struct DayBucket {
    pub day: &'static str,
    #[serde(with = "iso_date")]
    pub date: Date,
    pub exercises: Vec<ExerciseView>,
}

/// Everything the week planner page renders.
#[derive(Debug, Serialize)]
pub struct WeekView {
    pub week: i32,
    pub label: String,
    #[serde(with = "iso_date")]
    pub start_date: Date,
    #[serde(with = "iso_date")]
    pub end_date: Date,
    pub destination: String,
    pub weekly_focus: [String; 3],
    pub days: Vec<DayBucket>,
    pub summary: WeekSummary,
    pub read_only: bool,
    pub stage: WeekStage,
    pub ring: Option<RingColor>,
}

#[derive(Debug, Deserialize)]
pub struct AddExerciseRequest {
    /// `MON`..`SUN`
    pub day: String,
    pub name: String,
    pub sets: i32,
    pub reps: i32,
    #[serde(default)]
    pub duration: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct CompleteWeekRequest {
    /// One 0-10 rating per weekly focus activity.
    pub ratings: Vec<Option<i32>>,
}

#[derive(Debug, Serialize)]
pub struct WeekUnlocked {
    pub completed_week: i32,
    pub unlocked_week: Option<i32>,
    pub stats: WeekStats,
    pub ring: RingColor,
}
