//! In-memory implementation of the fitness store
//!
//! Used for local demos (`QUEST_STORAGE=memory`) and as the test double for
//! the pipeline and routes. Every operation runs under one lock, so the
//! atomicity guarantees match the PostgreSQL store.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::FitnessStore;
use crate::{
    models::{
        AvatarUpdate, DailyStats, Exercise, MuscleGroup, MuscleGroupStats, NewExercise,
        NewWorkout, NewWorkoutExercise, StatsDelta, TotalsUpdate, User, Workout, WorkoutExercise,
    },
    progression::StreakChange,
};

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    exercises: Vec<Exercise>,
    workouts: Vec<Workout>,
    daily: BTreeMap<(Uuid, NaiveDate), DailyStats>,
    muscles: BTreeMap<(Uuid, MuscleGroup), MuscleGroupStats>,
    #[cfg(test)]
    failing: std::collections::HashSet<&'static str>,
}

impl MemoryState {
    #[cfg(test)]
    fn check(&self, operation: &'static str) -> Result<()> {
        if self.failing.contains(operation) {
            return Err(anyhow!("injected failure in {}", operation));
        }
        Ok(())
    }

    #[cfg(not(test))]
    fn check(&self, _operation: &'static str) -> Result<()> {
        Ok(())
    }

    fn user_mut(&mut self, id: Uuid) -> Result<&mut User> {
        self.users
            .get_mut(&id)
            .ok_or_else(|| anyhow!("User {} not found", id))
    }
}

/// Counter addition that fails like an out-of-range INTEGER column
fn add(current: i32, delta: i32) -> Result<i32> {
    current
        .checked_add(delta)
        .ok_or_else(|| anyhow!("integer out of range"))
}

/// Fitness store held entirely in process memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call to `operation` fail until cleared
    #[cfg(test)]
    pub async fn fail_on(&self, operation: &'static str) {
        self.state.lock().await.failing.insert(operation);
    }

    /// Overwrite a stored user, for arranging test scenarios
    #[cfg(test)]
    pub async fn put_user(&self, user: User) {
        self.state.lock().await.users.insert(user.id, user);
    }

    /// Number of stored workouts across all users
    #[cfg(test)]
    pub async fn workout_count(&self) -> usize {
        self.state.lock().await.workouts.len()
    }
}

#[async_trait]
impl FitnessStore for MemoryStore {
    async fn health_check(&self) -> Result<bool> {
        let state = self.state.lock().await;
        Ok(state.check("health_check").is_ok())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        let state = self.state.lock().await;
        state.check("find_user")?;
        Ok(state.users.get(&id).cloned())
    }

    async fn ensure_user(&self, id: Uuid, email: &str) -> Result<User> {
        let mut state = self.state.lock().await;
        state.check("ensure_user")?;
        let user = state
            .users
            .entry(id)
            .or_insert_with(|| User::new(id, email, Utc::now()));
        Ok(user.clone())
    }

    async fn update_avatar(&self, id: Uuid, update: &AvatarUpdate) -> Result<Option<User>> {
        let mut state = self.state.lock().await;
        state.check("update_avatar")?;
        let Some(user) = state.users.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(username) = &update.username {
            user.username = Some(username.trim().to_string());
        }
        if let Some(color) = &update.color {
            user.avatar_color = Some(color.clone());
        }
        if let Some(accessory) = &update.accessory {
            user.avatar_accessory = Some(accessory.clone());
        }
        if let Some(outfit) = &update.outfit {
            user.avatar_outfit = Some(outfit.clone());
        }

        Ok(Some(user.clone()))
    }

    async fn top_users_by_xp(&self, limit: i64) -> Result<Vec<User>> {
        let state = self.state.lock().await;
        state.check("top_users_by_xp")?;
        let mut users: Vec<User> = state.users.values().cloned().collect();
        users.sort_by(|a, b| b.xp.cmp(&a.xp).then(a.created_at.cmp(&b.created_at)));
        users.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(users)
    }

    async fn list_exercises(&self) -> Result<Vec<Exercise>> {
        let state = self.state.lock().await;
        state.check("list_exercises")?;
        let mut exercises = state.exercises.clone();
        exercises.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(exercises)
    }

    async fn find_exercise_by_name(&self, name: &str) -> Result<Option<Exercise>> {
        let state = self.state.lock().await;
        state.check("find_exercise_by_name")?;
        Ok(state
            .exercises
            .iter()
            .find(|exercise| exercise.matches_name(name))
            .cloned())
    }

    async fn create_exercise(&self, exercise: &NewExercise) -> Result<Exercise> {
        let mut state = self.state.lock().await;
        state.check("create_exercise")?;
        if let Some(existing) = state
            .exercises
            .iter()
            .find(|existing| existing.matches_name(&exercise.name))
        {
            return Ok(existing.clone());
        }

        let created = Exercise {
            id: Uuid::new_v4(),
            name: exercise.name.clone(),
            muscle_group: exercise.muscle_group,
            exercise_type: exercise.exercise_type,
            description: exercise.description.clone(),
            difficulty: exercise.difficulty,
            xp_per_set: exercise.xp_per_set,
            gold_per_set: exercise.gold_per_set,
        };
        state.exercises.push(created.clone());
        Ok(created)
    }

    async fn insert_workout(
        &self,
        workout: &NewWorkout,
        exercises: &[NewWorkoutExercise],
    ) -> Result<Workout> {
        let mut state = self.state.lock().await;
        state.check("insert_workout")?;
        if !state.users.contains_key(&workout.user_id) {
            return Err(anyhow!("User {} not found", workout.user_id));
        }
        if let Some(missing) = exercises
            .iter()
            .find(|e| !state.exercises.iter().any(|known| known.id == e.exercise_id))
        {
            return Err(anyhow!("Exercise {} not found", missing.exercise_id));
        }

        let id = Uuid::new_v4();
        let saved = Workout {
            id,
            user_id: workout.user_id,
            title: workout.title.clone(),
            date: workout.date,
            duration: workout.duration,
            total_xp: workout.total_xp,
            total_gold: workout.total_gold,
            completed: workout.completed,
            exercises: exercises
                .iter()
                .enumerate()
                .map(|(position, exercise)| WorkoutExercise {
                    id: Uuid::new_v4(),
                    workout_id: id,
                    exercise_id: exercise.exercise_id,
                    position: position as i32,
                    sets: exercise.sets,
                    reps: exercise.reps,
                    weight: exercise.weight,
                    duration: exercise.duration,
                    distance: exercise.distance,
                    xp_earned: exercise.xp_earned,
                    gold_earned: exercise.gold_earned,
                })
                .collect(),
        };

        state.workouts.push(saved.clone());
        Ok(saved)
    }

    async fn list_workouts(&self, user_id: Uuid, limit: i64) -> Result<Vec<Workout>> {
        let state = self.state.lock().await;
        state.check("list_workouts")?;
        let mut workouts: Vec<Workout> = state
            .workouts
            .iter()
            .filter(|workout| workout.user_id == user_id)
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal timestamps, so reverse first
        workouts.reverse();
        workouts.sort_by(|a, b| b.date.cmp(&a.date));
        workouts.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(workouts)
    }

    async fn apply_workout_totals(
        &self,
        user_id: Uuid,
        delta: &StatsDelta,
        at: DateTime<Utc>,
    ) -> Result<TotalsUpdate> {
        let mut state = self.state.lock().await;
        state.check("apply_workout_totals")?;
        let user = state.user_mut(user_id)?;

        let previous_last_workout = user.last_workout_date;
        let xp = add(user.xp, delta.xp)?;
        let gold = add(user.gold, delta.gold)?;
        let total_workouts = add(user.total_workouts, delta.workouts)?;
        let total_duration = add(user.total_duration, delta.duration)?;

        user.xp = xp;
        user.gold = gold;
        user.total_workouts = total_workouts;
        user.total_duration = total_duration;
        user.last_workout_date = Some(at);

        Ok(TotalsUpdate {
            user: user.clone(),
            previous_last_workout,
        })
    }

    async fn record_daily_stats(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        delta: &StatsDelta,
    ) -> Result<DailyStats> {
        let mut state = self.state.lock().await;
        state.check("record_daily_stats")?;
        let current = state.daily.get(&(user_id, date));
        let stats = DailyStats {
            user_id,
            date,
            xp_gained: add(current.map_or(0, |s| s.xp_gained), delta.xp)?,
            gold_gained: add(current.map_or(0, |s| s.gold_gained), delta.gold)?,
            workouts_completed: add(
                current.map_or(0, |s| s.workouts_completed),
                delta.workouts,
            )?,
            duration: add(current.map_or(0, |s| s.duration), delta.duration)?,
        };

        state.daily.insert((user_id, date), stats.clone());
        Ok(stats)
    }

    async fn record_muscle_stats(
        &self,
        user_id: Uuid,
        group: MuscleGroup,
        sets: i32,
        xp: i32,
    ) -> Result<MuscleGroupStats> {
        let mut state = self.state.lock().await;
        state.check("record_muscle_stats")?;
        let current = state.muscles.get(&(user_id, group));
        let stats = MuscleGroupStats {
            user_id,
            muscle_group: group,
            sets_completed: add(current.map_or(0, |s| s.sets_completed), sets)?,
            xp_earned: add(current.map_or(0, |s| s.xp_earned), xp)?,
        };

        state.muscles.insert((user_id, group), stats.clone());
        Ok(stats)
    }

    async fn apply_streak(&self, user_id: Uuid, change: StreakChange) -> Result<i32> {
        let mut state = self.state.lock().await;
        state.check("apply_streak")?;
        let user = state.user_mut(user_id)?;
        user.streak_count = change.apply(user.streak_count);
        Ok(user.streak_count)
    }

    async fn promote_level(
        &self,
        user_id: Uuid,
        from_level: i32,
        min_xp: i32,
    ) -> Result<Option<i32>> {
        let mut state = self.state.lock().await;
        state.check("promote_level")?;
        let user = state.user_mut(user_id)?;
        if user.level != from_level || user.xp < min_xp {
            return Ok(None);
        }

        user.level += 1;
        Ok(Some(user.level))
    }

    async fn daily_stats(&self, user_id: Uuid, since: NaiveDate) -> Result<Vec<DailyStats>> {
        let state = self.state.lock().await;
        state.check("daily_stats")?;
        Ok(state
            .daily
            .range((user_id, since)..=(user_id, NaiveDate::MAX))
            .map(|(_, stats)| stats.clone())
            .collect())
    }

    async fn muscle_stats(&self, user_id: Uuid) -> Result<Vec<MuscleGroupStats>> {
        let state = self.state.lock().await;
        state.check("muscle_stats")?;
        Ok(state
            .muscles
            .values()
            .filter(|stats| stats.user_id == user_id)
            .cloned()
            .collect())
    }
}
