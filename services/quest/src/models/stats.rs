//! Cumulative and rollup statistics models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{MuscleGroup, User};

/// Daily rollup for one user and one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub xp_gained: i32,
    pub gold_gained: i32,
    pub workouts_completed: i32,
    pub duration: i32,
}

/// Per-muscle-group rollup for one user
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MuscleGroupStats {
    pub user_id: Uuid,
    #[sqlx(try_from = "String")]
    pub muscle_group: MuscleGroup,
    pub sets_completed: i32,
    pub xp_earned: i32,
}

/// Amounts a single committed workout adds to the running totals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsDelta {
    pub xp: i32,
    pub gold: i32,
    pub workouts: i32,
    pub duration: i32,
}

/// Result of applying a workout to the user's cumulative totals
#[derive(Debug, Clone)]
pub struct TotalsUpdate {
    /// The profile after the increment
    pub user: User,
    /// `last_workout_date` as it was before this workout stamped it
    pub previous_last_workout: Option<DateTime<Utc>>,
}

/// Query parameters for the daily rollup listing
#[derive(Debug, Clone, Deserialize)]
pub struct DailyStatsQuery {
    /// Number of days back from today, inclusive of today
    pub days: Option<u32>,
}

impl DailyStatsQuery {
    pub const DEFAULT_DAYS: u32 = 30;
    pub const MAX_DAYS: u32 = 366;

    pub fn days(&self) -> u32 {
        self.days
            .unwrap_or(Self::DEFAULT_DAYS)
            .clamp(1, Self::MAX_DAYS)
    }
}
