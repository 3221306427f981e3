//! Calendar helpers shared by the journey, week planner and read models.
//!
//! All arithmetic works on `time::Date`, i.e. plain local calendar days with no
//! time-of-day component, so week boundaries never shift with UTC offsets.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use time::{format_description::FormatItem, macros::format_description, Date, Duration};

use crate::{error::AppError, state::AppState};

time::serde::format_description!(pub iso_date, Date, "[year]-[month]-[day]");

const ISO_DATE: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

pub const DAY_NAMES: [&str; 7] = ["MON", "TUE", "WED", "THU", "FRI", "SAT", "SUN"];

/// Parses `YYYY-MM-DD`.
pub fn parse_iso_date(s: &str) -> Option<Date> {
    Date::parse(s.trim(), ISO_DATE).ok()
}

/// Monday of the week containing `date`.
pub fn monday_of(date: Date) -> Date {
    let back = date.weekday().number_days_from_monday() as i64;
    date.saturating_sub(Duration::days(back))
}

/// The seven calendar days (Monday..Sunday) of journey week `week`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekRange {
    pub week: i32,
    pub days: [Date; 7],
}

impl WeekRange {
    pub fn start(&self) -> Date {
        self.days[0]
    }

    pub fn end(&self) -> Date {
        self.days[6]
    }

    pub fn contains(&self, date: Date) -> bool {
        date >= self.start() && date <= self.end()
    }

    /// Index 0..7 (Monday-based) of `date` inside the week.
    pub fn day_index(&self, date: Date) -> Option<usize> {
        self.days.iter().position(|d| *d == date)
    }

    /// e.g. `Jan 5 - Jan 11, 2026`
    pub fn label(&self) -> String {
        format!(
            "{} - {}, {}",
            month_day(self.start()),
            month_day(self.end()),
            self.end().year()
        )
    }
}

/// Week `n` starts on the Monday of the journey start week plus `(n - 1) * 7` days.
pub fn week_range(journey_start: Date, week: i32) -> WeekRange {
    let first_monday = monday_of(journey_start);
    let start = first_monday.saturating_add(Duration::days(7 * (week as i64 - 1)));
    let mut days = [start; 7];
    for (i, day) in days.iter_mut().enumerate() {
        *day = start.saturating_add(Duration::days(i as i64));
    }
    WeekRange { week, days }
}

/// Journey week number a calendar date falls into, if it is on or after week 1.
pub fn week_of(journey_start: Date, date: Date) -> Option<i32> {
    let offset = (monday_of(date) - monday_of(journey_start)).whole_days();
    if offset < 0 {
        return None;
    }
    Some((offset / 7) as i32 + 1)
}

const MONTH_DAY: &[FormatItem<'static>] = format_description!("[month repr:short] [day padding:none]");

fn month_day(date: Date) -> String {
    date.format(MONTH_DAY).unwrap_or_else(|_| date.to_string())
}

pub const LOCAL_DATE_HEADER: &str = "x-local-date";

/// "Today" in the caller's calendar: the `X-Local-Date` header when present,
/// otherwise the configured server offset.
#[derive(Debug, Clone, Copy)]
pub struct LocalToday(pub Date);

#[async_trait]
impl FromRequestParts<AppState> for LocalToday {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match parts.headers.get(LOCAL_DATE_HEADER) {
            Some(raw) => raw
                .to_str()
                .ok()
                .and_then(parse_iso_date)
                .map(LocalToday)
                .ok_or_else(|| AppError::validation("X-Local-Date must be YYYY-MM-DD")),
            None => Ok(LocalToday(state.config.local_today())),
        }
    }
}
