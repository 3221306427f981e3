use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub patient_id: Option<String>,
    pub ultimate_goal: Option<String>,
}

/// What a data reset removed. Re-running a reset reports zeros.
#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct ResetReport {
    pub exercises_deleted: u64,
    pub goals_deleted: u64,
    pub journey_deleted: bool,
    pub profile_reset: bool,
}
