//! Streak and level rules
//!
//! Pure functions over the user's counters. Storage applies the outcome.

use chrono::{DateTime, Utc};

/// Experience required per level step
pub const XP_PER_LEVEL: i32 = 100;

/// Experience at which `level` is promoted
pub fn level_threshold(level: i32) -> i32 {
    level.saturating_mul(XP_PER_LEVEL)
}

/// The level after one promotion check. Never more than one step.
pub fn next_level(level: i32, xp: i32) -> Option<i32> {
    (xp >= level_threshold(level)).then(|| level + 1)
}

/// Experience still missing for the next promotion, never negative
pub fn xp_to_next_level(level: i32, xp: i32) -> i32 {
    (level_threshold(level) - xp).max(0)
}

/// How a workout moves the consecutive-day counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakChange {
    /// First recorded workout
    Start,
    /// Already counted today, or the previous date lies in the future
    Unchanged,
    /// Previous workout was on the day before
    Extend,
    /// At least one full day was skipped
    Reset,
}

impl StreakChange {
    /// Decide the change from the previous workout time and the commit time.
    /// Days are UTC calendar days.
    pub fn between(previous: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        let Some(previous) = previous else {
            return StreakChange::Start;
        };

        let days = now
            .date_naive()
            .signed_duration_since(previous.date_naive())
            .num_days();

        match days {
            1 => StreakChange::Extend,
            d if d > 1 => StreakChange::Reset,
            _ => StreakChange::Unchanged,
        }
    }

    /// The counter after applying this change
    pub fn apply(self, current: i32) -> i32 {
        match self {
            StreakChange::Start => 1,
            StreakChange::Unchanged => current,
            StreakChange::Extend => current + 1,
            StreakChange::Reset => 0,
        }
    }
}
