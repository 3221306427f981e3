use serde::{Deserialize, Serialize};
use time::Date;

use crate::calendar::iso_date;
use crate::store::Exercise;
use crate::week::flow::WeekStage;

/// An exercise as the planner and diary render it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExerciseView {
    #[serde(flatten)]
    pub exercise: Exercise,
    pub completed_set_count: usize,
    pub average_rating: Option<f64>,
}

impl From<Exercise> for ExerciseView {
    fn from(exercise: Exercise) -> Self {
        Self {
            completed_set_count: exercise.completed_count(),
            average_rating: exercise.average_rating(),
            exercise,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CompleteSetRequest {
    /// Zero-based; must equal the number of sets already completed.
    pub index: usize,
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SetOutcome {
    pub exercise: ExerciseView,
    /// Journey week the exercise belongs to, when the journey has a start date.
    pub week: Option<i32>,
    pub week_stage: Option<WeekStage>,
}

#[derive(Debug, Deserialize)]
pub struct ExerciseQuery {
    #[serde(default, with = "iso_date::option")]
    pub date: Option<Date>,
    #[serde(default, with = "iso_date::option")]
    pub from: Option<Date>,
    #[serde(default, with = "iso_date::option")]
    pub to: Option<Date>,
    #[serde(default)]
    pub status: StatusFilter,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Completed,
}

impl StatusFilter {
    pub fn keeps(self, exercise: &Exercise) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Pending => !exercise.is_complete(),
            StatusFilter::Completed => exercise.is_complete(),
        }
    }
}
