//! Leaderboard ranking

use anyhow::Result;

use crate::{
    models::{
        LeaderboardEntry, LeaderboardQuery, LeaderboardSort, User,
        user::{
            AVATAR_ACCESSORIES, AVATAR_COLORS, DEFAULT_AVATAR_ACCESSORY, DEFAULT_AVATAR_COLOR,
            known_or,
        },
    },
    repositories::FitnessStore,
};

pub const MAX_LIMIT: u32 = 100;

/// Top users by experience, re-ranked by the requested key
pub async fn leaderboard(
    store: &dyn FitnessStore,
    query: &LeaderboardQuery,
    default_limit: u32,
) -> Result<Vec<LeaderboardEntry>> {
    let limit = query.limit.unwrap_or(default_limit).clamp(1, MAX_LIMIT);
    let users = store.top_users_by_xp(i64::from(limit)).await?;
    Ok(rank(users, query.sort.unwrap_or_default()))
}

/// Stable re-sort of a page already ordered by experience
pub fn rank(mut users: Vec<User>, sort: LeaderboardSort) -> Vec<LeaderboardEntry> {
    match sort {
        LeaderboardSort::Xp => users.sort_by(|a, b| b.xp.cmp(&a.xp)),
        LeaderboardSort::Level => users.sort_by(|a, b| b.level.cmp(&a.level)),
        LeaderboardSort::Workouts => users.sort_by(|a, b| b.total_workouts.cmp(&a.total_workouts)),
        LeaderboardSort::Streak => users.sort_by(|a, b| b.streak_count.cmp(&a.streak_count)),
    }

    users
        .into_iter()
        .zip(1..)
        .map(|(user, rank)| LeaderboardEntry {
            rank,
            name: user.display_name(),
            avatar_color: known_or(user.avatar_color.as_deref(), &AVATAR_COLORS, DEFAULT_AVATAR_COLOR),
            avatar_accessory: known_or(
                user.avatar_accessory.as_deref(),
                &AVATAR_ACCESSORIES,
                DEFAULT_AVATAR_ACCESSORY,
            ),
            id: user.id,
            email: user.email,
            level: user.level,
            xp: user.xp,
            total_workouts: user.total_workouts,
            total_duration: user.total_duration,
            streak: user.streak_count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StatsDelta;
    use crate::repositories::MemoryStore;
    use chrono::Utc;
    use uuid::Uuid;

    fn user(email: &str, xp: i32, level: i32, workouts: i32, streak: i32) -> User {
        let mut user = User::new(Uuid::new_v4(), email, Utc::now());
        user.xp = xp;
        user.level = level;
        user.total_workouts = workouts;
        user.streak_count = streak;
        user
    }

    fn page() -> Vec<User> {
        vec![
            user("ada@example.com", 300, 3, 5, 1),
            user("bob@example.com", 250, 3, 9, 0),
            user("cy@example.com", 120, 2, 9, 6),
        ]
    }

    fn names(entries: &[LeaderboardEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_rank_by_xp_assigns_positions() {
        let entries = rank(page(), LeaderboardSort::Xp);
        assert_eq!(names(&entries), vec!["ada", "bob", "cy"]);
        assert_eq!(entries.iter().map(|e| e.rank).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(entries[0].avatar_color, "blue");
        assert_eq!(entries[0].avatar_accessory, "none");
    }

    #[test]
    fn test_resort_is_stable() {
        // Equal level keeps the experience order
        assert_eq!(names(&rank(page(), LeaderboardSort::Level)), vec!["ada", "bob", "cy"]);
        assert_eq!(names(&rank(page(), LeaderboardSort::Workouts)), vec!["bob", "cy", "ada"]);
        assert_eq!(names(&rank(page(), LeaderboardSort::Streak)), vec!["cy", "ada", "bob"]);
    }

    #[tokio::test]
    async fn test_leaderboard_limits_page() {
        let store = MemoryStore::new();
        for (i, xp) in [50, 10, 30].into_iter().enumerate() {
            let id = Uuid::new_v4();
            store.ensure_user(id, &format!("user{}@example.com", i)).await.unwrap();
            let delta = StatsDelta {
                xp,
                ..Default::default()
            };
            store.apply_workout_totals(id, &delta, Utc::now()).await.unwrap();
        }

        let query = LeaderboardQuery {
            sort: None,
            limit: Some(2),
        };
        let entries = leaderboard(&store, &query, 10).await.unwrap();
        assert_eq!(names(&entries), vec!["user0", "user2"]);

        let query = LeaderboardQuery {
            sort: None,
            limit: Some(0),
        };
        assert_eq!(leaderboard(&store, &query, 10).await.unwrap().len(), 1);
    }
}
