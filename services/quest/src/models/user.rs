//! User profile model and avatar customisation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::progression;

pub const AVATAR_COLORS: [&str; 5] = ["blue", "red", "green", "purple", "orange"];
pub const AVATAR_ACCESSORIES: [&str; 5] = ["none", "headband", "glasses", "cap", "bandana"];
pub const AVATAR_OUTFITS: [&str; 5] = ["tank-top", "t-shirt", "hoodie", "tracksuit", "sleeveless"];

pub const DEFAULT_AVATAR_COLOR: &str = "blue";
pub const DEFAULT_AVATAR_ACCESSORY: &str = "none";
pub const DEFAULT_AVATAR_OUTFIT: &str = "tank-top";

const MAX_USERNAME_LEN: usize = 32;

/// User profile row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: Option<String>,
    pub level: i32,
    pub xp: i32,
    pub gold: i32,
    pub total_workouts: i32,
    /// Minutes
    pub total_duration: i32,
    pub streak_count: i32,
    pub last_workout_date: Option<DateTime<Utc>>,
    pub avatar_color: Option<String>,
    pub avatar_accessory: Option<String>,
    pub avatar_outfit: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// A freshly provisioned profile with every counter zeroed
    pub fn new(id: Uuid, email: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            email: email.to_string(),
            username: None,
            level: 1,
            xp: 0,
            gold: 0,
            total_workouts: 0,
            total_duration: 0,
            streak_count: 0,
            last_workout_date: None,
            avatar_color: None,
            avatar_accessory: None,
            avatar_outfit: None,
            created_at,
        }
    }

    /// Name shown to other users: the chosen username, else the email local part
    pub fn display_name(&self) -> String {
        match &self.username {
            Some(name) if !name.is_empty() => name.clone(),
            _ => self
                .email
                .split('@')
                .next()
                .unwrap_or_default()
                .to_string(),
        }
    }
}

/// Profile as returned to its owner, with avatar defaults resolved
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub username: Option<String>,
    pub level: i32,
    pub xp: i32,
    pub gold: i32,
    pub total_workouts: i32,
    pub total_duration: i32,
    pub streak_count: i32,
    pub last_workout_date: Option<DateTime<Utc>>,
    pub avatar_color: &'static str,
    pub avatar_accessory: &'static str,
    pub avatar_outfit: &'static str,
    pub xp_to_next_level: i32,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            avatar_color: known_or(user.avatar_color.as_deref(), &AVATAR_COLORS, DEFAULT_AVATAR_COLOR),
            avatar_accessory: known_or(
                user.avatar_accessory.as_deref(),
                &AVATAR_ACCESSORIES,
                DEFAULT_AVATAR_ACCESSORY,
            ),
            avatar_outfit: known_or(user.avatar_outfit.as_deref(), &AVATAR_OUTFITS, DEFAULT_AVATAR_OUTFIT),
            xp_to_next_level: progression::xp_to_next_level(user.level, user.xp),
            id: user.id,
            email: user.email,
            username: user.username,
            level: user.level,
            xp: user.xp,
            gold: user.gold,
            total_workouts: user.total_workouts,
            total_duration: user.total_duration,
            streak_count: user.streak_count,
            last_workout_date: user.last_workout_date,
            created_at: user.created_at,
        }
    }
}

/// Resolve a stored option against its known values, falling back to the default
pub fn known_or(value: Option<&str>, known: &[&'static str], default: &'static str) -> &'static str {
    value
        .and_then(|v| known.iter().copied().find(|k| *k == v))
        .unwrap_or(default)
}

/// Avatar customisation update
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarUpdate {
    pub username: Option<String>,
    pub color: Option<String>,
    pub accessory: Option<String>,
    pub outfit: Option<String>,
}

impl AvatarUpdate {
    /// Check every provided field against its allowed values
    pub fn validate(&self) -> Result<(), String> {
        if self.username.is_none()
            && self.color.is_none()
            && self.accessory.is_none()
            && self.outfit.is_none()
        {
            return Err("Nothing to update".to_string());
        }

        if let Some(username) = &self.username {
            let trimmed = username.trim();
            if trimmed.is_empty() {
                return Err("Username must not be empty".to_string());
            }
            if trimmed.chars().count() > MAX_USERNAME_LEN {
                return Err(format!(
                    "Username must be at most {} characters long",
                    MAX_USERNAME_LEN
                ));
            }
        }

        check_option("color", &self.color, &AVATAR_COLORS)?;
        check_option("accessory", &self.accessory, &AVATAR_ACCESSORIES)?;
        check_option("outfit", &self.outfit, &AVATAR_OUTFITS)?;

        Ok(())
    }
}

fn check_option(field: &str, value: &Option<String>, known: &[&str]) -> Result<(), String> {
    match value {
        Some(v) if !known.contains(&v.as_str()) => Err(format!(
            "Unknown avatar {} '{}', expected one of: {}",
            field,
            v,
            known.join(", ")
        )),
        _ => Ok(()),
    }
}
