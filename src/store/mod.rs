//! Persistence seam. Handlers and services only see [`Store`]; Postgres backs it in
//! production and [`MemoryStore`] in tests.

use async_trait::async_trait;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::exercises::model::CompletedSet;

pub mod memory;
pub mod postgres;
mod types;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use types::{
    Exercise, Goal, JourneyProgress, NewExercise, Profile, ProfilePatch, Session, User, WeekStats,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    // ---- accounts ----

    /// Fails with `Conflict` when the email is taken.
    async fn create_user(&self, email: &str, name: &str, password_hash: &str) -> StoreResult<User>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn create_session(&self, user_id: Uuid, expires_at: OffsetDateTime) -> StoreResult<Session>;
    async fn get_session(&self, id: Uuid) -> StoreResult<Option<Session>>;
    async fn delete_session(&self, id: Uuid) -> StoreResult<()>;

    // ---- profiles ----

    async fn create_profile(&self, profile: &Profile) -> StoreResult<Profile>;
    async fn get_profile(&self, user_id: Uuid) -> StoreResult<Option<Profile>>;
    async fn update_profile(&self, user_id: Uuid, patch: &ProfilePatch) -> StoreResult<Profile>;

    // ---- journeys ----

    async fn get_journey(&self, user_id: Uuid) -> StoreResult<Option<JourneyProgress>>;

    /// Creates or updates the user's journey with the three weekly focus activities
    /// and resets both journey and profile to week 1.
    async fn save_weekly_goals(
        &self,
        user_id: Uuid,
        ultimate_goal: &str,
        weekly_goals: &[String; 3],
    ) -> StoreResult<JourneyProgress>;

    async fn set_journey_destination(&self, user_id: Uuid, ultimate_goal: &str) -> StoreResult<()>;

    /// Sets the start date on journey and profile unless one is already recorded.
    /// Returns the date in effect afterwards.
    async fn anchor_journey_start(&self, user_id: Uuid, date: Date) -> StoreResult<Date>;

    /// Atomically appends `week` to the completed weeks, stores its stats and moves
    /// journey and profile to `week + 1`. Returns `None` when `week` is not the
    /// current week or was already recorded, leaving everything untouched.
    async fn record_week_completion(
        &self,
        user_id: Uuid,
        week: i32,
        stats: &WeekStats,
    ) -> StoreResult<Option<JourneyProgress>>;

    /// Idempotent; returns whether a document was removed.
    async fn delete_journey(&self, user_id: Uuid) -> StoreResult<bool>;

    // ---- exercises ----

    async fn create_exercise(&self, new: &NewExercise) -> StoreResult<Exercise>;
    async fn get_exercise(&self, user_id: Uuid, id: Uuid) -> StoreResult<Option<Exercise>>;

    /// Replaces the completed-set list only if the stored list still has
    /// `expected_len` entries. `None` means another write got there first.
    async fn save_completed_sets(
        &self,
        user_id: Uuid,
        id: Uuid,
        expected_len: usize,
        sets: &[CompletedSet],
        completed: bool,
    ) -> StoreResult<Option<Exercise>>;

    /// Exercises dated within `from..=to`, ordered by date then creation.
    async fn list_exercises(&self, user_id: Uuid, from: Date, to: Date) -> StoreResult<Vec<Exercise>>;

    /// Idempotent; returns the number removed.
    async fn delete_exercises(&self, user_id: Uuid) -> StoreResult<u64>;

    // ---- goals ----

    async fn create_goal(&self, user_id: Uuid, title: &str, date: Date) -> StoreResult<Goal>;
    async fn list_goals(&self, user_id: Uuid, date: Option<Date>) -> StoreResult<Vec<Goal>>;
    async fn set_goal_completed(&self, user_id: Uuid, id: Uuid, completed: bool) -> StoreResult<Goal>;
    async fn delete_goal(&self, user_id: Uuid, id: Uuid) -> StoreResult<()>;
    async fn delete_goals(&self, user_id: Uuid) -> StoreResult<u64>;
}
