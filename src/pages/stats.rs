use std::collections::BTreeSet;

use time::{Date, Duration};

use crate::store::Exercise;

/// Days with at least one completed exercise.
pub fn active_days(exercises: &[Exercise]) -> BTreeSet<Date> {
    exercises
        .iter()
        .filter(|e| e.is_complete())
        .map(|e| e.date)
        .collect()
}

/// Consecutive active days ending today. A today with nothing done yet does not
/// break the streak; counting then starts from yesterday.
pub fn day_streak(active: &BTreeSet<Date>, today: Date) -> u32 {
    let mut day = if active.contains(&today) {
        today
    } else {
        today.saturating_sub(Duration::days(1))
    };
    let mut streak = 0;
    while active.contains(&day) {
        streak += 1;
        day = day.saturating_sub(Duration::days(1));
    }
    streak
}

/// Whole percent, 0 when there is nothing to count.
pub fn percent(done: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    ((done as f64 / total as f64) * 100.0).round() as u32
}
