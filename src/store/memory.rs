use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use time::{Date, OffsetDateTime};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    Exercise, Goal, JourneyProgress, NewExercise, Profile, ProfilePatch, Session, Store,
    StoreError, StoreResult, User, WeekStats,
};
use crate::exercises::model::CompletedSet;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    sessions: HashMap<Uuid, Session>,
    profiles: HashMap<Uuid, Profile>,
    journeys: HashMap<Uuid, JourneyProgress>, // keyed by user id
    exercises: HashMap<Uuid, Exercise>,
    goals: HashMap<Uuid, Goal>,
}

/// In-process store. Every operation takes the single table lock, so compound
/// writes are atomic just like the Postgres transactions.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, every mutating call fails with `Unavailable`.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// When set, every lookup fails with `Unavailable`.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    fn check_readable(&self) -> StoreResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("reads disabled".into()));
        }
        Ok(())
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, email: &str, name: &str, password_hash: &str) -> StoreResult<User> {
        self.check_writable()?;
        let mut t = self.tables.write().await;
        if t.users.values().any(|u| u.email == email) {
            return Err(StoreError::Conflict("Email already registered".into()));
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.to_string(),
            password_hash: password_hash.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        t.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.check_readable()?;
        let t = self.tables.read().await;
        Ok(t.users.values().find(|u| u.email == email).cloned())
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.check_readable()?;
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn create_session(&self, user_id: Uuid, expires_at: OffsetDateTime) -> StoreResult<Session> {
        self.check_writable()?;
        let session = Session {
            id: Uuid::new_v4(),
            user_id,
            created_at: OffsetDateTime::now_utc(),
            expires_at,
        };
        self.tables.write().await.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn get_session(&self, id: Uuid) -> StoreResult<Option<Session>> {
        self.check_readable()?;
        Ok(self.tables.read().await.sessions.get(&id).cloned())
    }

    async fn delete_session(&self, id: Uuid) -> StoreResult<()> {
        self.check_writable()?;
        self.tables.write().await.sessions.remove(&id);
        Ok(())
    }

    async fn create_profile(&self, profile: &Profile) -> StoreResult<Profile> {
        self.check_writable()?;
        let mut t = self.tables.write().await;
        if t.profiles.contains_key(&profile.user_id) {
            return Err(StoreError::Conflict("Profile already exists".into()));
        }
        t.profiles.insert(profile.user_id, profile.clone());
        Ok(profile.clone())
    }

    async fn get_profile(&self, user_id: Uuid) -> StoreResult<Option<Profile>> {
        self.check_readable()?;
        Ok(self.tables.read().await.profiles.get(&user_id).cloned())
    }

    async fn update_profile(&self, user_id: Uuid, patch: &ProfilePatch) -> StoreResult<Profile> {
        self.check_writable()?;
        let mut t = self.tables.write().await;
        let profile = t.profiles.get_mut(&user_id).ok_or(StoreError::NotFound("profile"))?;
        patch.apply(profile);
        Ok(profile.clone())
    }

    async fn get_journey(&self, user_id: Uuid) -> StoreResult<Option<JourneyProgress>> {
        self.check_readable()?;
        Ok(self.tables.read().await.journeys.get(&user_id).cloned())
    }

    async fn save_weekly_goals(
        &self,
        user_id: Uuid,
        ultimate_goal: &str,
        weekly_goals: &[String; 3],
    ) -> StoreResult<JourneyProgress> {
        self.check_writable()?;
        let now = OffsetDateTime::now_utc();
        let mut t = self.tables.write().await;
        let journey = t.journeys.entry(user_id).or_insert_with(|| JourneyProgress {
            id: Uuid::new_v4(),
            user_id,
            ultimate_goal: String::new(),
            current_week: 1,
            completed_weeks: Vec::new(),
            weekly_goals: Default::default(),
            week_stats: Default::default(),
            journey_start_date: None,
            created_at: now,
            updated_at: now,
        });
        journey.ultimate_goal = ultimate_goal.to_string();
        journey.weekly_goals = weekly_goals.clone();
        journey.current_week = 1;
        journey.updated_at = now;
        let saved = journey.clone();
        if let Some(profile) = t.profiles.get_mut(&user_id) {
            profile.current_week = 1;
        }
        Ok(saved)
    }

    async fn set_journey_destination(&self, user_id: Uuid, ultimate_goal: &str) -> StoreResult<()> {
        self.check_writable()?;
        let mut t = self.tables.write().await;
        if let Some(j) = t.journeys.get_mut(&user_id) {
            j.ultimate_goal = ultimate_goal.to_string();
            j.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }

    async fn anchor_journey_start(&self, user_id: Uuid, date: Date) -> StoreResult<Date> {
        self.check_writable()?;
        let mut t = self.tables.write().await;
        let journey = t.journeys.get_mut(&user_id).ok_or(StoreError::NotFound("journey"))?;
        let anchored = *journey.journey_start_date.get_or_insert(date);
        if let Some(profile) = t.profiles.get_mut(&user_id) {
            profile.journey_start_date.get_or_insert(anchored);
        }
        Ok(anchored)
    }

    async fn record_week_completion(
        &self,
        user_id: Uuid,
        week: i32,
        stats: &WeekStats,
    ) -> StoreResult<Option<JourneyProgress>> {
        self.check_writable()?;
        let mut t = self.tables.write().await;
        let Some(journey) = t.journeys.get_mut(&user_id) else {
            return Ok(None);
        };
        if journey.current_week != week || journey.completed_weeks.contains(&week) {
            return Ok(None);
        }
        journey.completed_weeks.push(week);
        journey.week_stats.insert(week, *stats);
        journey.current_week = week + 1;
        journey.updated_at = OffsetDateTime::now_utc();
        let saved = journey.clone();
        if let Some(profile) = t.profiles.get_mut(&user_id) {
            profile.current_week = week + 1;
        }
        Ok(Some(saved))
    }

    async fn delete_journey(&self, user_id: Uuid) -> StoreResult<bool> {
        self.check_writable()?;
        Ok(self.tables.write().await.journeys.remove(&user_id).is_some())
    }

    async fn create_exercise(&self, new: &NewExercise) -> StoreResult<Exercise> {
        self.check_writable()?;
        let exercise = Exercise {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            name: new.name.clone(),
            sets: new.sets,
            reps: new.reps,
            duration: new.duration,
            date: new.date,
            completed: false,
            completed_sets: Vec::new(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.tables.write().await.exercises.insert(exercise.id, exercise.clone());
        Ok(exercise)
    }

    async fn get_exercise(&self, user_id: Uuid, id: Uuid) -> StoreResult<Option<Exercise>> {
        self.check_readable()?;
        let t = self.tables.read().await;
        Ok(t.exercises.get(&id).filter(|e| e.user_id == user_id).cloned())
    }

    async fn save_completed_sets(
        &self,
        user_id: Uuid,
        id: Uuid,
        expected_len: usize,
        sets: &[CompletedSet],
        completed: bool,
    ) -> StoreResult<Option<Exercise>> {
        self.check_writable()?;
        let mut t = self.tables.write().await;
        let exercise = t
            .exercises
            .get_mut(&id)
            .filter(|e| e.user_id == user_id)
            .ok_or(StoreError::NotFound("exercise"))?;
        if exercise.completed_sets.len() != expected_len {
            return Ok(None);
        }
        exercise.completed_sets = sets.to_vec();
        exercise.completed = completed;
        Ok(Some(exercise.clone()))
    }

    async fn list_exercises(&self, user_id: Uuid, from: Date, to: Date) -> StoreResult<Vec<Exercise>> {
        self.check_readable()?;
        let t = self.tables.read().await;
        let mut out: Vec<Exercise> = t
            .exercises
            .values()
            .filter(|e| e.user_id == user_id && e.date >= from && e.date <= to)
            .cloned()
            .collect();
        out.sort_by(|a, b| (a.date, a.created_at).cmp(&(b.date, b.created_at)));
        Ok(out)
    }

    async fn delete_exercises(&self, user_id: Uuid) -> StoreResult<u64> {
        self.check_writable()?;
        let mut t = self.tables.write().await;
        let before = t.exercises.len();
        t.exercises.retain(|_, e| e.user_id != user_id);
        Ok((before - t.exercises.len()) as u64)
    }

    async fn create_goal(&self, user_id: Uuid, title: &str, date: Date) -> StoreResult<Goal> {
        self.check_writable()?;
        let goal = Goal {
            id: Uuid::new_v4(),
            user_id,
            title: title.to_string(),
            completed: false,
            date,
            created_at: OffsetDateTime::now_utc(),
        };
        self.tables.write().await.goals.insert(goal.id, goal.clone());
        Ok(goal)
    }

    async fn list_goals(&self, user_id: Uuid, date: Option<Date>) -> StoreResult<Vec<Goal>> {
        self.check_readable()?;
        let t = self.tables.read().await;
        let mut out: Vec<Goal> = t
            .goals
            .values()
            .filter(|g| g.user_id == user_id && date.map_or(true, |d| g.date == d))
            .cloned()
            .collect();
        out.sort_by(|a, b| (a.date, a.created_at).cmp(&(b.date, b.created_at)));
        Ok(out)
    }

    async fn set_goal_completed(&self, user_id: Uuid, id: Uuid, completed: bool) -> StoreResult<Goal> {
        self.check_writable()?;
        let mut t = self.tables.write().await;
        let goal = t
            .goals
            .get_mut(&id)
            .filter(|g| g.user_id == user_id)
            .ok_or(StoreError::NotFound("goal"))?;
        goal.completed = completed;
        Ok(goal.clone())
    }

    async fn delete_goal(&self, user_id: Uuid, id: Uuid) -> StoreResult<()> {
        self.check_writable()?;
        let mut t = self.tables.write().await;
        match t.goals.get(&id) {
            Some(g) if g.user_id == user_id => {
                t.goals.remove(&id);
                Ok(())
            }
            _ => Err(StoreError::NotFound("goal")),
        }
    }

    async fn delete_goals(&self, user_id: Uuid) -> StoreResult<u64> {
        self.check_writable()?;
        let mut t = self.tables.write().await;
        let before = t.goals.len();
        t.goals.retain(|_, g| g.user_id != user_id);
        Ok((before - t.goals.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    async fn seeded() -> (MemoryStore, Uuid) {
        let store = MemoryStore::new();
        let user = store.create_user("pat@example.com", "Pat", "hash").await.unwrap();
        store
            .create_profile(&Profile::new(user.id, "Pat", OffsetDateTime::now_utc()))
            .await
            .unwrap();
        (store, user.id)
    }

    fn goals() -> [String; 3] {
        ["Walk 5000 steps".into(), "Climb stairs".into(), "Squat 50kg".into()]
    }

    fn stats() -> WeekStats {
        WeekStats {
            total_exercises: 4,
            completed_exercises: 3,
            missed_exercises: 1,
            goal_ratings: [5, 6, 7],
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let (store, _) = seeded().await;
        let err = store.create_user("pat@example.com", "Other", "h").await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn week_completion_is_recorded_once() {
        let (store, user_id) = seeded().await;
        store.save_weekly_goals(user_id, "Run again", &goals()).await.unwrap();

        let first = store.record_week_completion(user_id, 1, &stats()).await.unwrap();
        let again = store.record_week_completion(user_id, 1, &stats()).await.unwrap();

        let journey = first.expect("first completion lands");
        assert_eq!(journey.completed_weeks, vec![1]);
        assert_eq!(journey.current_week, 2);
        assert!(again.is_none());
        assert_eq!(store.get_profile(user_id).await.unwrap().unwrap().current_week, 2);
    }

    #[tokio::test]
    async fn completed_sets_use_compare_on_count() {
        let (store, user_id) = seeded().await;
        let ex = store
            .create_exercise(&NewExercise {
                user_id,
                name: "Heel Slides".into(),
                sets: 3,
                reps: 15,
                duration: 0,
                date: date!(2026 - 01 - 07),
            })
            .await
            .unwrap();
        let one = vec![CompletedSet { rating: 4, comment: None }];
        assert!(store.save_completed_sets(user_id, ex.id, 0, &one, false).await.unwrap().is_some());
        assert!(store.save_completed_sets(user_id, ex.id, 0, &one, false).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn anchoring_keeps_first_date() {
        let (store, user_id) = seeded().await;
        store.save_weekly_goals(user_id, "Run again", &goals()).await.unwrap();
        let first = store.anchor_journey_start(user_id, date!(2026 - 01 - 07)).await.unwrap();
        let second = store.anchor_journey_start(user_id, date!(2026 - 02 - 01)).await.unwrap();
        assert_eq!(first, date!(2026 - 01 - 07));
        assert_eq!(second, first);
        let profile = store.get_profile(user_id).await.unwrap().unwrap();
        assert_eq!(profile.journey_start_date, Some(first));
    }

    #[tokio::test]
    async fn failing_writes_leave_data_untouched() {
        let (store, user_id) = seeded().await;
        store.fail_writes(true);
        let patch = ProfilePatch {
            ultimate_goal: Some("Swim".into()),
            ..Default::default()
        };
        assert!(matches!(
            store.update_profile(user_id, &patch).await,
            Err(StoreError::Unavailable(_))
        ));
        store.fail_writes(false);
        assert_eq!(store.get_profile(user_id).await.unwrap().unwrap().ultimate_goal, "");
    }
}
