//! Domain models and request/response payloads
//!
//! Storage rows map through `sqlx::FromRow` using the snake_case column names;
//! everything that crosses the HTTP boundary is camelCase via serde.

use thiserror::Error;

pub mod exercise;
pub mod leaderboard;
pub mod stats;
pub mod user;
pub mod workout;

pub use exercise::{Exercise, ExerciseType, MuscleGroup, NewExercise};
pub use leaderboard::{LeaderboardEntry, LeaderboardQuery, LeaderboardSort};
pub use stats::{DailyStats, DailyStatsQuery, MuscleGroupStats, StatsDelta, TotalsUpdate};
pub use user::{AvatarUpdate, User, UserProfile};
pub use workout::{
    CompleteWorkoutRequest, NewWorkout, NewWorkoutExercise, PerformedExercise, Workout,
    WorkoutExercise, WorkoutHistoryQuery, WorkoutReceipt,
};

/// A stored enumeration value that is not one of the known variants
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}
