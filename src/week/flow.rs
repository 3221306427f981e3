//! Week completion rules: when the congratulations step appears, what a finished
//! week records, and which rating submissions are accepted.

use serde::Serialize;

use crate::calendar::WeekRange;
use crate::error::AppError;
use crate::store::{Exercise, JourneyProgress, WeekStats};

pub const MAX_GOAL_RATING: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekStage {
    InProgress,
    /// Every exercise on the final day is done; waiting for the three ratings.
    Congratulations,
    /// Recorded in `completed_weeks`; the week is read-only.
    Completed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WeekSummary {
    pub total: u32,
    pub completed: u32,
    pub missed: u32,
}

/// Counts exercises dated inside `range`.
pub fn summarize(range: &WeekRange, exercises: &[Exercise]) -> WeekSummary {
    let in_week: Vec<&Exercise> = exercises.iter().filter(|e| range.contains(e.date)).collect();
    let total = in_week.len() as u32;
    let completed = in_week.iter().filter(|e| e.is_complete()).count() as u32;
    WeekSummary {
        total,
        completed,
        missed: total - completed,
    }
}

/// Congratulations only on the current, not yet recorded week, once the final
/// day has at least one exercise and all of them are complete.
pub fn week_stage(journey: &JourneyProgress, range: &WeekRange, exercises: &[Exercise]) -> WeekStage {
    if journey.is_week_completed(range.week) {
        return WeekStage::Completed;
    }
    if range.week != journey.current_week {
        return WeekStage::InProgress;
    }
    let mut last_day = exercises.iter().filter(|e| e.date == range.end()).peekable();
    if last_day.peek().is_some() && last_day.all(|e| e.is_complete()) {
        WeekStage::Congratulations
    } else {
        WeekStage::InProgress
    }
}

/// All three ratings must be present and within 0..=10.
pub fn validate_ratings(ratings: &[Option<i32>]) -> Result<[u8; 3], AppError> {
    if ratings.len() != 3 {
        return Err(AppError::validation("Rate all three weekly focus activities"));
    }
    let mut out = [0u8; 3];
    for (slot, rating) in out.iter_mut().zip(ratings) {
        let Some(r) = rating else {
            return Err(AppError::validation("Rate all three weekly focus activities"));
        };
        if !(0..=MAX_GOAL_RATING).contains(r) {
            return Err(AppError::validation(format!(
                "Ratings must be between 0 and {MAX_GOAL_RATING}"
            )));
        }
        *slot = *r as u8;
    }
    Ok(out)
}

pub fn week_stats(summary: WeekSummary, goal_ratings: [u8; 3]) -> WeekStats {
    WeekStats {
        total_exercises: summary.total,
        completed_exercises: summary.completed,
        missed_exercises: summary.missed,
        goal_ratings,
    }
}
