//! Repositories for database operations
//!
//! `FitnessStore` is the seam between the progression pipeline and storage.
//! Counter updates are expressed as deltas so implementations can apply them
//! atomically instead of writing back values computed from an earlier read.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    models::{
        AvatarUpdate, DailyStats, Exercise, MuscleGroup, MuscleGroupStats, NewExercise,
        NewWorkout, NewWorkoutExercise, StatsDelta, TotalsUpdate, User, Workout,
    },
    progression::StreakChange,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Storage operations used by the service
#[async_trait]
pub trait FitnessStore: Send + Sync {
    /// Check that the backing storage answers
    async fn health_check(&self) -> Result<bool>;

    // ================================
    // Users
    // ================================

    /// Find a user by ID
    async fn find_user(&self, id: Uuid) -> Result<Option<User>>;

    /// Return the user's profile, creating it with zeroed counters if absent
    async fn ensure_user(&self, id: Uuid, email: &str) -> Result<User>;

    /// Apply an avatar update, returning `None` if the user does not exist
    async fn update_avatar(&self, id: Uuid, update: &AvatarUpdate) -> Result<Option<User>>;

    /// Users with the most experience first
    async fn top_users_by_xp(&self, limit: i64) -> Result<Vec<User>>;

    // ================================
    // Exercise catalog
    // ================================

    /// All durable catalog rows
    async fn list_exercises(&self) -> Result<Vec<Exercise>>;

    /// Case-insensitive lookup by name
    async fn find_exercise_by_name(&self, name: &str) -> Result<Option<Exercise>>;

    /// Insert a catalog row. If a row with the same name (ignoring case)
    /// already exists, that row is returned instead.
    async fn create_exercise(&self, exercise: &NewExercise) -> Result<Exercise>;

    // ================================
    // Workouts
    // ================================

    /// Insert a workout and all of its exercises atomically
    async fn insert_workout(
        &self,
        workout: &NewWorkout,
        exercises: &[NewWorkoutExercise],
    ) -> Result<Workout>;

    /// The user's workouts, newest first, with their exercises
    async fn list_workouts(&self, user_id: Uuid, limit: i64) -> Result<Vec<Workout>>;

    // ================================
    // Progression
    // ================================

    /// Add the delta to the user's totals and stamp `last_workout_date`
    async fn apply_workout_totals(
        &self,
        user_id: Uuid,
        delta: &StatsDelta,
        at: DateTime<Utc>,
    ) -> Result<TotalsUpdate>;

    /// Add the delta to the user's rollup for `date`, creating it if needed
    async fn record_daily_stats(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        delta: &StatsDelta,
    ) -> Result<DailyStats>;

    /// Add sets and experience to the user's rollup for `group`
    async fn record_muscle_stats(
        &self,
        user_id: Uuid,
        group: MuscleGroup,
        sets: i32,
        xp: i32,
    ) -> Result<MuscleGroupStats>;

    /// Apply a streak change, returning the new streak count
    async fn apply_streak(&self, user_id: Uuid, change: StreakChange) -> Result<i32>;

    /// Promote the user from `from_level` by one level if they are still at
    /// that level and have at least `min_xp`. Returns the new level if the
    /// promotion happened.
    async fn promote_level(&self, user_id: Uuid, from_level: i32, min_xp: i32)
    -> Result<Option<i32>>;

    /// The user's daily rollups from `since` onwards, oldest first
    async fn daily_stats(&self, user_id: Uuid, since: NaiveDate) -> Result<Vec<DailyStats>>;

    /// The user's muscle-group rollups
    async fn muscle_stats(&self, user_id: Uuid) -> Result<Vec<MuscleGroupStats>>;
}
