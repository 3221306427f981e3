use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct DestinationRequest {
    pub destination: String,
}

/// The three focus activities for the weekly setup form.
#[derive(Debug, Deserialize)]
pub struct WeeklyGoalsRequest {
    pub activities: Vec<String>,
}
