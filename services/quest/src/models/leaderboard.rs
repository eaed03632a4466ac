//! Leaderboard payloads

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Key the leaderboard page is ranked by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaderboardSort {
    #[default]
    Xp,
    Level,
    Workouts,
    Streak,
}

/// Query parameters for the leaderboard
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaderboardQuery {
    pub sort: Option<LeaderboardSort>,
    pub limit: Option<u32>,
}

/// One ranked user
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub level: i32,
    pub xp: i32,
    pub total_workouts: i32,
    pub total_duration: i32,
    pub avatar_color: &'static str,
    pub avatar_accessory: &'static str,
    pub streak: i32,
}
