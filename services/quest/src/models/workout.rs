//! Workout models and the workout completion payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const DEFAULT_WORKOUT_TITLE: &str = "Workout";

const MAX_TITLE_LEN: usize = 100;
const MAX_EXERCISES_PER_WORKOUT: usize = 100;

/// Longest accepted workout or exercise, in minutes
pub const MAX_WORKOUT_MINUTES: i32 = 24 * 60;

/// Persisted workout with its exercises
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Workout {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub date: DateTime<Utc>,
    /// Minutes
    pub duration: i32,
    pub total_xp: i32,
    pub total_gold: i32,
    pub completed: bool,
    #[sqlx(skip)]
    pub exercises: Vec<WorkoutExercise>,
}

/// One performed exercise inside a persisted workout
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutExercise {
    pub id: Uuid,
    pub workout_id: Uuid,
    pub exercise_id: Uuid,
    #[serde(skip)]
    pub position: i32,
    pub sets: i32,
    pub reps: Option<i32>,
    pub weight: Option<f64>,
    pub duration: Option<i32>,
    pub distance: Option<f64>,
    pub xp_earned: i32,
    pub gold_earned: i32,
}

/// Workout row to insert
#[derive(Debug, Clone, PartialEq)]
pub struct NewWorkout {
    pub user_id: Uuid,
    pub title: String,
    pub date: DateTime<Utc>,
    pub duration: i32,
    pub total_xp: i32,
    pub total_gold: i32,
    pub completed: bool,
}

/// Workout exercise row to insert, in workout order
#[derive(Debug, Clone, PartialEq)]
pub struct NewWorkoutExercise {
    pub exercise_id: Uuid,
    pub sets: i32,
    pub reps: Option<i32>,
    pub weight: Option<f64>,
    pub duration: Option<i32>,
    pub distance: Option<f64>,
    pub xp_earned: i32,
    pub gold_earned: i32,
}

/// An exercise as the client reports it, keyed by its catalog id
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformedExercise {
    pub exercise_id: String,
    pub reps: Option<i32>,
    pub weight: Option<f64>,
    /// Minutes
    pub duration: Option<i32>,
    /// Kilometres
    pub distance: Option<f64>,
}

/// Body of `POST /workouts`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteWorkoutRequest {
    pub title: Option<String>,
    /// Minutes
    pub duration: i32,
    #[serde(default = "default_completed")]
    pub completed: bool,
    pub exercises: Vec<PerformedExercise>,
}

fn default_completed() -> bool {
    true
}

impl CompleteWorkoutRequest {
    /// Reject payloads no workout could be built from
    pub fn validate(&self) -> Result<(), String> {
        if self.exercises.is_empty() {
            return Err("Please add at least one exercise to your workout".to_string());
        }
        if self.exercises.len() > MAX_EXERCISES_PER_WORKOUT {
            return Err(format!(
                "A workout may contain at most {} exercises",
                MAX_EXERCISES_PER_WORKOUT
            ));
        }
        if self.duration < 0 {
            return Err("Duration must not be negative".to_string());
        }
        if self.duration > MAX_WORKOUT_MINUTES {
            return Err(format!(
                "Duration must be at most {} minutes",
                MAX_WORKOUT_MINUTES
            ));
        }
        if let Some(title) = &self.title {
            if title.chars().count() > MAX_TITLE_LEN {
                return Err(format!(
                    "Title must be at most {} characters long",
                    MAX_TITLE_LEN
                ));
            }
        }

        for exercise in &self.exercises {
            if exercise.exercise_id.trim().is_empty() {
                return Err("Exercise id is required".to_string());
            }
            let negative = exercise.reps.is_some_and(|v| v < 0)
                || exercise.duration.is_some_and(|v| v < 0)
                || exercise.weight.is_some_and(|v| v < 0.0 || !v.is_finite())
                || exercise.distance.is_some_and(|v| v < 0.0 || !v.is_finite());
            if negative {
                return Err(format!(
                    "Measurements for '{}' must be non-negative numbers",
                    exercise.exercise_id
                ));
            }
            if exercise.duration.is_some_and(|v| v > MAX_WORKOUT_MINUTES) {
                return Err(format!(
                    "Duration of '{}' must be at most {} minutes",
                    exercise.exercise_id, MAX_WORKOUT_MINUTES
                ));
            }
        }

        Ok(())
    }

    /// The title to store, defaulting blank titles
    pub fn title(&self) -> String {
        match self.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => DEFAULT_WORKOUT_TITLE.to_string(),
        }
    }
}

/// Query parameters for the workout history
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkoutHistoryQuery {
    pub limit: Option<u32>,
}

impl WorkoutHistoryQuery {
    pub fn limit(&self) -> i64 {
        i64::from(self.limit.unwrap_or(20).clamp(1, 100))
    }
}

/// What a successful commit reports back
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutReceipt {
    pub success: bool,
    pub workout: Workout,
    /// Entries that could not be matched to the catalog
    pub dropped_exercises: usize,
    /// Streak after the commit, absent if the streak update failed
    pub streak: Option<i32>,
    /// Level after the commit, absent if the level check failed
    pub level: Option<i32>,
    pub leveled_up: bool,
}
