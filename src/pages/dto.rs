use serde::{Deserialize, Serialize};
use time::Date;

use crate::calendar::iso_date;
use crate::exercises::dto::ExerciseView;
use crate::journey::RingColor;
use crate::store::WeekStats;

#[derive(Debug, Default, Serialize)]
pub struct Dashboard {
    pub destination: Option<String>,
    pub current_week: i32,
    pub today_completed: u32,
    pub today_total: u32,
    pub day_streak: u32,
    pub days_active: u32,
    /// Completed share of the current week's exercises.
    pub week_progress_percent: u32,
}

#[derive(Debug, Serialize)]
pub struct ActivityRating {
    pub activity: String,
    pub rating: u8,
}

#[derive(Debug, Serialize)]
pub struct WeekProgress {
    pub week: i32,
    pub label: Option<String>,
    pub stats: WeekStats,
    pub ring: RingColor,
    pub completion_percent: u32,
    pub ratings: Vec<ActivityRating>,
}

#[derive(Debug, Default, Serialize)]
pub struct ProgressPage {
    pub destination: Option<String>,
    pub current_week: i32,
    pub weeks_completed: u32,
    pub overall_completion_percent: u32,
    pub weeks: Vec<WeekProgress>,
}

#[derive(Debug, Deserialize)]
pub struct DiaryQuery {
    #[serde(default, with = "iso_date::option")]
    pub from: Option<Date>,
    #[serde(default, with = "iso_date::option")]
    pub to: Option<Date>,
}

#[derive(Debug, Serialize)]
pub struct DiaryDay {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub exercises: Vec<ExerciseView>,
}

#[derive(Debug, Serialize)]
pub struct Diary {
    #[serde(with = "iso_date")]
    pub from: Date,
    #[serde(with = "iso_date")]
    pub to: Date,
    /// Newest first; days without entries are left out.
    pub days: Vec<DiaryDay>,
}

#[derive(Debug, Serialize)]
pub struct HelpSection {
    pub title: &'static str,
    pub body: &'static str,
}
