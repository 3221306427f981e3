use serde::{Deserialize, Serialize};
use time::Date;

use crate::calendar::iso_date;
use crate::store::Goal;

#[derive(Debug, Deserialize)]
pub struct GoalsQuery {
    #[serde(default, with = "iso_date::option")]
    pub date: Option<Date>,
}

#[derive(Debug, Deserialize)]
pub struct CreateGoalRequest {
    pub title: String,
    /// Defaults to today.
    #[serde(default, with = "iso_date::option")]
    pub date: Option<Date>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateGoalRequest {
    pub completed: bool,
}

/// The goals page: this week's focus activities plus the checklist.
#[derive(Debug, Serialize)]
pub struct GoalsPage {
    pub weekly_focus: Option<[String; 3]>,
    pub goals: Vec<Goal>,
}
