use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::{types::Json, FromRow, PgPool};
use time::{Date, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::{
    Exercise, Goal, JourneyProgress, NewExercise, Profile, ProfilePatch, Session, Store,
    StoreError, StoreResult, User, WeekStats,
};
use crate::exercises::model::{decode_notes, encode_notes, CompletedSet};

const USER_COLUMNS: &str = "id, email, name, password_hash, created_at";
const PROFILE_COLUMNS: &str = "user_id, name, patient_id, ultimate_goal, current_week, \
     journey_started, journey_start_date, created_at";
const JOURNEY_COLUMNS: &str = "id, user_id, ultimate_goal, current_week, completed_weeks, \
     weekly_goal1, weekly_goal2, weekly_goal3, week_stats, journey_start_date, created_at, updated_at";
const EXERCISE_COLUMNS: &str =
    "id, user_id, name, sets, reps, duration, date, completed, notes, created_at";
const GOAL_COLUMNS: &str = "id, user_id, title, completed, date, created_at";

#[derive(Debug, FromRow)]
struct JourneyRow {
    id: Uuid,
    user_id: Uuid,
    ultimate_goal: String,
    current_week: i32,
    completed_weeks: Vec<i32>,
    weekly_goal1: String,
    weekly_goal2: String,
    weekly_goal3: String,
    week_stats: Json<BTreeMap<i32, WeekStats>>,
    journey_start_date: Option<Date>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<JourneyRow> for JourneyProgress {
    fn from(r: JourneyRow) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            ultimate_goal: r.ultimate_goal,
            current_week: r.current_week,
            completed_weeks: r.completed_weeks,
            weekly_goals: [r.weekly_goal1, r.weekly_goal2, r.weekly_goal3],
            week_stats: r.week_stats.0,
            journey_start_date: r.journey_start_date,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ExerciseRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    sets: i32,
    reps: i32,
    duration: i32,
    date: Date,
    completed: bool,
    notes: String,
    created_at: OffsetDateTime,
}

impl From<ExerciseRow> for Exercise {
    fn from(r: ExerciseRow) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            name: r.name,
            sets: r.sets,
            reps: r.reps,
            duration: r.duration,
            date: r.date,
            completed: r.completed,
            completed_sets: decode_notes(&r.notes),
            created_at: r.created_at,
        }
    }
}

/// Postgres-backed [`Store`].
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, email: &str, name: &str, password_hash: &str) -> StoreResult<User> {
        let res = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, name, password_hash) VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
        ))
        .bind(email)
        .bind(name)
        .bind(password_hash)
        .fetch_one(&self.db)
        .await;
        match res {
            Ok(user) => Ok(user),
            Err(e) if is_unique_violation(&e) => {
                Err(StoreError::Conflict("Email already registered".into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn create_session(&self, user_id: Uuid, expires_at: OffsetDateTime) -> StoreResult<Session> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (user_id, expires_at)
            VALUES ($1, $2)
            RETURNING id, user_id, created_at, expires_at
            "#,
        )
        .bind(user_id)
        .bind(expires_at)
        .fetch_one(&self.db)
        .await?;
        Ok(session)
    }

    async fn get_session(&self, id: Uuid) -> StoreResult<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT id, user_id, created_at, expires_at FROM sessions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(session)
    }

    async fn delete_session(&self, id: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn create_profile(&self, profile: &Profile) -> StoreResult<Profile> {
        let res = sqlx::query_as::<_, Profile>(&format!(
            r#"
            INSERT INTO profiles (user_id, name, patient_id, ultimate_goal, current_week,
                                  journey_started, journey_start_date, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(profile.user_id)
        .bind(&profile.name)
        .bind(&profile.patient_id)
        .bind(&profile.ultimate_goal)
        .bind(profile.current_week)
        .bind(profile.journey_started)
        .bind(profile.journey_start_date)
        .bind(profile.created_at)
        .fetch_one(&self.db)
        .await;
        match res {
            Ok(p) => Ok(p),
            Err(e) if is_unique_violation(&e) => {
                Err(StoreError::Conflict("Profile already exists".into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_profile(&self, user_id: Uuid) -> StoreResult<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(profile)
    }

    async fn update_profile(&self, user_id: Uuid, patch: &ProfilePatch) -> StoreResult<Profile> {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            r#"
            UPDATE profiles
               SET name            = COALESCE($2, name),
                   patient_id      = COALESCE($3, patient_id),
                   ultimate_goal   = COALESCE($4, ultimate_goal),
                   current_week    = COALESCE($5, current_week),
                   journey_started = COALESCE($6, journey_started),
                   journey_start_date = CASE WHEN $7 THEN $8 ELSE journey_start_date END
             WHERE user_id = $1
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(patch.name.as_deref())
        .bind(patch.patient_id.as_deref())
        .bind(patch.ultimate_goal.as_deref())
        .bind(patch.current_week)
        .bind(patch.journey_started)
        .bind(patch.journey_start_date.is_some())
        .bind(patch.journey_start_date.flatten())
        .fetch_optional(&self.db)
        .await?;
        profile.ok_or(StoreError::NotFound("profile"))
    }

    async fn get_journey(&self, user_id: Uuid) -> StoreResult<Option<JourneyProgress>> {
        let row = sqlx::query_as::<_, JourneyRow>(&format!(
            "SELECT {JOURNEY_COLUMNS} FROM journeys WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn save_weekly_goals(
        &self,
        user_id: Uuid,
        ultimate_goal: &str,
        weekly_goals: &[String; 3],
    ) -> StoreResult<JourneyProgress> {
        let mut tx = self.db.begin().await?;
        let row = sqlx::query_as::<_, JourneyRow>(&format!(
            r#"
            INSERT INTO journeys (user_id, ultimate_goal, current_week,
                                  weekly_goal1, weekly_goal2, weekly_goal3)
            VALUES ($1, $2, 1, $3, $4, $5)
            ON CONFLICT (user_id) DO UPDATE
               SET ultimate_goal = EXCLUDED.ultimate_goal,
                   current_week  = 1,
                   weekly_goal1  = EXCLUDED.weekly_goal1,
                   weekly_goal2  = EXCLUDED.weekly_goal2,
                   weekly_goal3  = EXCLUDED.weekly_goal3,
                   updated_at    = now()
            RETURNING {JOURNEY_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(ultimate_goal)
        .bind(&weekly_goals[0])
        .bind(&weekly_goals[1])
        .bind(&weekly_goals[2])
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE profiles SET current_week = 1 WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(row.into())
    }

    async fn set_journey_destination(&self, user_id: Uuid, ultimate_goal: &str) -> StoreResult<()> {
        sqlx::query("UPDATE journeys SET ultimate_goal = $2, updated_at = now() WHERE user_id = $1")
            .bind(user_id)
            .bind(ultimate_goal)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn anchor_journey_start(&self, user_id: Uuid, date: Date) -> StoreResult<Date> {
        let mut tx = self.db.begin().await?;
        let anchored: Option<Option<Date>> = sqlx::query_scalar(
            r#"
            UPDATE journeys
               SET journey_start_date = COALESCE(journey_start_date, $2),
                   updated_at = now()
             WHERE user_id = $1
            RETURNING journey_start_date
            "#,
        )
        .bind(user_id)
        .bind(date)
        .fetch_optional(&mut *tx)
        .await?;
        let anchored = anchored
            .ok_or(StoreError::NotFound("journey"))?
            .unwrap_or(date);

        sqlx::query(
            "UPDATE profiles SET journey_start_date = COALESCE(journey_start_date, $2) WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(anchored)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(anchored)
    }

    async fn record_week_completion(
        &self,
        user_id: Uuid,
        week: i32,
        stats: &WeekStats,
    ) -> StoreResult<Option<JourneyProgress>> {
        let mut tx = self.db.begin().await?;
        let row = sqlx::query_as::<_, JourneyRow>(&format!(
            r#"
            UPDATE journeys
               SET completed_weeks = array_append(completed_weeks, $2),
                   current_week    = $2 + 1,
                   week_stats      = week_stats || jsonb_build_object($3::text, $4::jsonb),
                   updated_at      = now()
             WHERE user_id = $1
               AND current_week = $2
               AND NOT ($2 = ANY(completed_weeks))
            RETURNING {JOURNEY_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(week)
        .bind(week.to_string())
        .bind(Json(stats))
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            debug!(%user_id, week, "week completion already recorded or not current");
            return Ok(None);
        };

        sqlx::query("UPDATE profiles SET current_week = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(week + 1)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(Some(row.into()))
    }

    async fn delete_journey(&self, user_id: Uuid) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM journeys WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn create_exercise(&self, new: &NewExercise) -> StoreResult<Exercise> {
        let row = sqlx::query_as::<_, ExerciseRow>(&format!(
            r#"
            INSERT INTO exercises (user_id, name, sets, reps, duration, date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {EXERCISE_COLUMNS}
            "#
        ))
        .bind(new.user_id)
        .bind(&new.name)
        .bind(new.sets)
        .bind(new.reps)
        .bind(new.duration)
        .bind(new.date)
        .fetch_one(&self.db)
        .await?;
        Ok(row.into())
    }

    async fn get_exercise(&self, user_id: Uuid, id: Uuid) -> StoreResult<Option<Exercise>> {
        let row = sqlx::query_as::<_, ExerciseRow>(&format!(
            "SELECT {EXERCISE_COLUMNS} FROM exercises WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn save_completed_sets(
        &self,
        user_id: Uuid,
        id: Uuid,
        expected_len: usize,
        sets: &[CompletedSet],
        completed: bool,
    ) -> StoreResult<Option<Exercise>> {
        let row = sqlx::query_as::<_, ExerciseRow>(&format!(
            r#"
            UPDATE exercises
               SET notes = $4, completed_set_count = $5, completed = $6
             WHERE id = $1 AND user_id = $2 AND completed_set_count = $3
            RETURNING {EXERCISE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(expected_len as i32)
        .bind(encode_notes(sets))
        .bind(sets.len() as i32)
        .bind(completed)
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some(r) => Ok(Some(r.into())),
            None if self.get_exercise(user_id, id).await?.is_some() => Ok(None),
            None => Err(StoreError::NotFound("exercise")),
        }
    }

    async fn list_exercises(&self, user_id: Uuid, from: Date, to: Date) -> StoreResult<Vec<Exercise>> {
        let rows = sqlx::query_as::<_, ExerciseRow>(&format!(
            r#"
            SELECT {EXERCISE_COLUMNS}
              FROM exercises
             WHERE user_id = $1 AND date >= $2 AND date <= $3
             ORDER BY date ASC, created_at ASC
            "#
        ))
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete_exercises(&self, user_id: Uuid) -> StoreResult<u64> {
        let res = sqlx::query("DELETE FROM exercises WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected())
    }

    async fn create_goal(&self, user_id: Uuid, title: &str, date: Date) -> StoreResult<Goal> {
        let goal = sqlx::query_as::<_, Goal>(&format!(
            "INSERT INTO goals (user_id, title, date) VALUES ($1, $2, $3) RETURNING {GOAL_COLUMNS}"
        ))
        .bind(user_id)
        .bind(title)
        .bind(date)
        .fetch_one(&self.db)
        .await?;
        Ok(goal)
    }

    async fn list_goals(&self, user_id: Uuid, date: Option<Date>) -> StoreResult<Vec<Goal>> {
        let goals = sqlx::query_as::<_, Goal>(&format!(
            r#"
            SELECT {GOAL_COLUMNS}
              FROM goals
             WHERE user_id = $1 AND ($2::date IS NULL OR date = $2)
             ORDER BY date ASC, created_at ASC
            "#
        ))
        .bind(user_id)
        .bind(date)
        .fetch_all(&self.db)
        .await?;
        Ok(goals)
    }

    async fn set_goal_completed(&self, user_id: Uuid, id: Uuid, completed: bool) -> StoreResult<Goal> {
        let goal = sqlx::query_as::<_, Goal>(&format!(
            "UPDATE goals SET completed = $3 WHERE id = $1 AND user_id = $2 RETURNING {GOAL_COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .bind(completed)
        .fetch_optional(&self.db)
        .await?;
        goal.ok_or(StoreError::NotFound("goal"))
    }

    async fn delete_goal(&self, user_id: Uuid, id: Uuid) -> StoreResult<()> {
        let res = sqlx::query("DELETE FROM goals WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.db)
            .await?;
        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound("goal"));
        }
        Ok(())
    }

    async fn delete_goals(&self, user_id: Uuid) -> StoreResult<u64> {
        let res = sqlx::query("DELETE FROM goals WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected())
    }
}
