//! PostgreSQL implementation of the fitness store

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use super::FitnessStore;
use crate::{
    models::{
        AvatarUpdate, DailyStats, Exercise, MuscleGroup, MuscleGroupStats, NewExercise,
        NewWorkout, NewWorkoutExercise, StatsDelta, TotalsUpdate, User, Workout, WorkoutExercise,
    },
    progression::StreakChange,
};

const USER_COLUMNS: &str = "id, email, username, level, xp, gold, total_workouts, total_duration, \
     streak_count, last_workout_date, avatar_color, avatar_accessory, avatar_outfit, created_at";

const EXERCISE_COLUMNS: &str =
    "id, name, muscle_group, type, description, difficulty, xp_per_set, gold_per_set";

const WORKOUT_COLUMNS: &str = "id, user_id, title, date, duration, total_xp, total_gold, completed";

const WORKOUT_EXERCISE_COLUMNS: &str = "id, workout_id, exercise_id, position, sets, reps, weight, \
     duration, distance, xp_earned, gold_earned";

/// Fitness store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new store over an initialised pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FitnessStore for PgStore {
    async fn health_check(&self) -> Result<bool> {
        Ok(common::database::health_check(&self.pool).await?)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn ensure_user(&self, id: Uuid, email: &str) -> Result<User> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO users (id, email)
            VALUES ($1, $2)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(email)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() > 0 {
            info!("Created user record for {}", id);
        }

        self.find_user(id)
            .await?
            .ok_or_else(|| anyhow!("User {} missing after provisioning", id))
    }

    async fn update_avatar(&self, id: Uuid, update: &AvatarUpdate) -> Result<Option<User>> {
        let sql = format!(
            r#"
            UPDATE users SET
                username = COALESCE($2, username),
                avatar_color = COALESCE($3, avatar_color),
                avatar_accessory = COALESCE($4, avatar_accessory),
                avatar_outfit = COALESCE($5, avatar_outfit)
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(update.username.as_deref().map(str::trim))
            .bind(update.color.as_deref())
            .bind(update.accessory.as_deref())
            .bind(update.outfit.as_deref())
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn top_users_by_xp(&self, limit: i64) -> Result<Vec<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY xp DESC, created_at ASC LIMIT $1"
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }

    async fn list_exercises(&self) -> Result<Vec<Exercise>> {
        let sql = format!("SELECT {EXERCISE_COLUMNS} FROM exercises ORDER BY name");
        let exercises = sqlx::query_as::<_, Exercise>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(exercises)
    }

    async fn find_exercise_by_name(&self, name: &str) -> Result<Option<Exercise>> {
        let sql = format!("SELECT {EXERCISE_COLUMNS} FROM exercises WHERE LOWER(name) = LOWER($1)");
        let exercise = sqlx::query_as::<_, Exercise>(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(exercise)
    }

    async fn create_exercise(&self, exercise: &NewExercise) -> Result<Exercise> {
        let sql = format!(
            r#"
            INSERT INTO exercises (name, muscle_group, type, description, difficulty, xp_per_set, gold_per_set)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT ((LOWER(name))) DO NOTHING
            RETURNING {EXERCISE_COLUMNS}
            "#
        );

        let created = sqlx::query_as::<_, Exercise>(&sql)
            .bind(&exercise.name)
            .bind(exercise.muscle_group.as_str())
            .bind(exercise.exercise_type.as_str())
            .bind(&exercise.description)
            .bind(exercise.difficulty)
            .bind(exercise.xp_per_set)
            .bind(exercise.gold_per_set)
            .fetch_optional(&self.pool)
            .await?;

        match created {
            Some(created) => {
                info!("Created exercise in database: {}", created.name);
                Ok(created)
            }
            // Lost a race with another writer; use the row that won
            None => self
                .find_exercise_by_name(&exercise.name)
                .await?
                .ok_or_else(|| anyhow!("Exercise {} conflicted but was not found", exercise.name)),
        }
    }

    async fn insert_workout(
        &self,
        workout: &NewWorkout,
        exercises: &[NewWorkoutExercise],
    ) -> Result<Workout> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            INSERT INTO workouts (user_id, title, date, duration, total_xp, total_gold, completed)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {WORKOUT_COLUMNS}
            "#
        );
        let mut saved = sqlx::query_as::<_, Workout>(&sql)
            .bind(workout.user_id)
            .bind(&workout.title)
            .bind(workout.date)
            .bind(workout.duration)
            .bind(workout.total_xp)
            .bind(workout.total_gold)
            .bind(workout.completed)
            .fetch_one(&mut *tx)
            .await?;

        if !exercises.is_empty() {
            let mut builder = QueryBuilder::<Postgres>::new(
                "INSERT INTO workout_exercises (workout_id, exercise_id, position, sets, reps, \
                 weight, duration, distance, xp_earned, gold_earned) ",
            );
            builder.push_values(exercises.iter().enumerate(), |mut row, (position, exercise)| {
                row.push_bind(saved.id)
                    .push_bind(exercise.exercise_id)
                    .push_bind(position as i32)
                    .push_bind(exercise.sets)
                    .push_bind(exercise.reps)
                    .push_bind(exercise.weight)
                    .push_bind(exercise.duration)
                    .push_bind(exercise.distance)
                    .push_bind(exercise.xp_earned)
                    .push_bind(exercise.gold_earned);
            });
            builder.push(format!(" RETURNING {WORKOUT_EXERCISE_COLUMNS}"));

            let mut children: Vec<WorkoutExercise> =
                builder.build_query_as().fetch_all(&mut *tx).await?;
            children.sort_by_key(|child| child.position);
            saved.exercises = children;
        }

        tx.commit().await?;
        Ok(saved)
    }

    async fn list_workouts(&self, user_id: Uuid, limit: i64) -> Result<Vec<Workout>> {
        let sql = format!(
            "SELECT {WORKOUT_COLUMNS} FROM workouts WHERE user_id = $1 ORDER BY date DESC LIMIT $2"
        );
        let mut workouts = sqlx::query_as::<_, Workout>(&sql)
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        if workouts.is_empty() {
            return Ok(workouts);
        }

        let ids: Vec<Uuid> = workouts.iter().map(|w| w.id).collect();
        let sql = format!(
            "SELECT {WORKOUT_EXERCISE_COLUMNS} FROM workout_exercises \
             WHERE workout_id = ANY($1) ORDER BY workout_id, position"
        );
        let rows = sqlx::query_as::<_, WorkoutExercise>(&sql)
            .bind(&ids)
            .fetch_all(&self.pool)
            .await?;

        let mut by_workout: HashMap<Uuid, Vec<WorkoutExercise>> = HashMap::new();
        for row in rows {
            by_workout.entry(row.workout_id).or_default().push(row);
        }
        for workout in &mut workouts {
            workout.exercises = by_workout.remove(&workout.id).unwrap_or_default();
        }

        Ok(workouts)
    }

    async fn apply_workout_totals(
        &self,
        user_id: Uuid,
        delta: &StatsDelta,
        at: DateTime<Utc>,
    ) -> Result<TotalsUpdate> {
        let mut tx = self.pool.begin().await?;

        let previous_last_workout = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
            "SELECT last_workout_date FROM users WHERE id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| anyhow!("User {} not found", user_id))?;

        let sql = format!(
            r#"
            UPDATE users SET
                xp = xp + $2,
                gold = gold + $3,
                total_workouts = total_workouts + $4,
                total_duration = total_duration + $5,
                last_workout_date = $6
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .bind(delta.xp)
            .bind(delta.gold)
            .bind(delta.workouts)
            .bind(delta.duration)
            .bind(at)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(TotalsUpdate {
            user,
            previous_last_workout,
        })
    }

    async fn record_daily_stats(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        delta: &StatsDelta,
    ) -> Result<DailyStats> {
        let stats = sqlx::query_as::<_, DailyStats>(
            r#"
            INSERT INTO user_stats_history (user_id, date, xp_gained, gold_gained, workouts_completed, duration)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, date) DO UPDATE SET
                xp_gained = user_stats_history.xp_gained + EXCLUDED.xp_gained,
                gold_gained = user_stats_history.gold_gained + EXCLUDED.gold_gained,
                workouts_completed = user_stats_history.workouts_completed + EXCLUDED.workouts_completed,
                duration = user_stats_history.duration + EXCLUDED.duration
            RETURNING user_id, date, xp_gained, gold_gained, workouts_completed, duration
            "#,
        )
        .bind(user_id)
        .bind(date)
        .bind(delta.xp)
        .bind(delta.gold)
        .bind(delta.workouts)
        .bind(delta.duration)
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }

    async fn record_muscle_stats(
        &self,
        user_id: Uuid,
        group: MuscleGroup,
        sets: i32,
        xp: i32,
    ) -> Result<MuscleGroupStats> {
        let stats = sqlx::query_as::<_, MuscleGroupStats>(
            r#"
            INSERT INTO user_muscle_stats (user_id, muscle_group, sets_completed, xp_earned)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, muscle_group) DO UPDATE SET
                sets_completed = user_muscle_stats.sets_completed + EXCLUDED.sets_completed,
                xp_earned = user_muscle_stats.xp_earned + EXCLUDED.xp_earned
            RETURNING user_id, muscle_group, sets_completed, xp_earned
            "#,
        )
        .bind(user_id)
        .bind(group.as_str())
        .bind(sets)
        .bind(xp)
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }

    async fn apply_streak(&self, user_id: Uuid, change: StreakChange) -> Result<i32> {
        let sql = match change {
            StreakChange::Start => "UPDATE users SET streak_count = 1 WHERE id = $1 RETURNING streak_count",
            StreakChange::Extend => {
                "UPDATE users SET streak_count = streak_count + 1 WHERE id = $1 RETURNING streak_count"
            }
            StreakChange::Reset => "UPDATE users SET streak_count = 0 WHERE id = $1 RETURNING streak_count",
            StreakChange::Unchanged => "SELECT streak_count FROM users WHERE id = $1",
        };

        sqlx::query_scalar::<_, i32>(sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| anyhow!("User {} not found", user_id))
    }

    async fn promote_level(
        &self,
        user_id: Uuid,
        from_level: i32,
        min_xp: i32,
    ) -> Result<Option<i32>> {
        let level = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE users SET level = level + 1
            WHERE id = $1 AND level = $2 AND xp >= $3
            RETURNING level
            "#,
        )
        .bind(user_id)
        .bind(from_level)
        .bind(min_xp)
        .fetch_optional(&self.pool)
        .await?;

        Ok(level)
    }

    async fn daily_stats(&self, user_id: Uuid, since: NaiveDate) -> Result<Vec<DailyStats>> {
        let stats = sqlx::query_as::<_, DailyStats>(
            r#"
            SELECT user_id, date, xp_gained, gold_gained, workouts_completed, duration
            FROM user_stats_history
            WHERE user_id = $1 AND date >= $2
            ORDER BY date ASC
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(stats)
    }

    async fn muscle_stats(&self, user_id: Uuid) -> Result<Vec<MuscleGroupStats>> {
        let stats = sqlx::query_as::<_, MuscleGroupStats>(
            r#"
            SELECT user_id, muscle_group, sets_completed, xp_earned
            FROM user_muscle_stats
            WHERE user_id = $1
            ORDER BY muscle_group
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    //! These tests need a reachable PostgreSQL instance and only run when
    //! `DATABASE_URL` is set.

    use super::*;
    use crate::models::ExerciseType;
    use chrono::TimeZone;
    use common::database::{DatabaseConfig, init_pool, run_migrations};

    async fn store() -> Result<Option<PgStore>> {
        if std::env::var("DATABASE_URL").is_err() {
            eprintln!("Skipping: DATABASE_URL not set");
            return Ok(None);
        }

        let pool = init_pool(&DatabaseConfig::from_env()?).await?;
        run_migrations(&pool).await?;
        Ok(Some(PgStore::new(pool)))
    }

    async fn user(store: &PgStore) -> Result<Uuid> {
        let id = Uuid::new_v4();
        store.ensure_user(id, &format!("{}@example.com", id.simple())).await?;
        Ok(id)
    }

    async fn delete_user(store: &PgStore, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&store.pool)
            .await?;
        Ok(())
    }

    fn new_exercise(name: &str) -> NewExercise {
        NewExercise {
            name: name.to_string(),
            muscle_group: MuscleGroup::Chest,
            exercise_type: ExerciseType::Strength,
            description: "Test exercise".to_string(),
            difficulty: 1,
            xp_per_set: 10,
            gold_per_set: 2,
        }
    }

    #[tokio::test]
    async fn test_create_exercise_returns_existing_row_on_case_folded_name() -> Result<()> {
        let Some(store) = store().await? else {
            return Ok(());
        };

        let name = format!("Press {}", Uuid::new_v4().simple());
        let first = store.create_exercise(&new_exercise(&name)).await?;
        let second = store.create_exercise(&new_exercise(&name.to_uppercase())).await?;

        assert_eq!(first.id, second.id);
        assert_eq!(second.name, name);

        sqlx::query("DELETE FROM exercises WHERE id = $1")
            .bind(first.id)
            .execute(&store.pool)
            .await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_insert_workout_rolls_back_on_unknown_exercise() -> Result<()> {
        let Some(store) = store().await? else {
            return Ok(());
        };
        let user_id = user(&store).await?;

        let workout = NewWorkout {
            user_id,
            title: "Broken".to_string(),
            date: Utc::now(),
            duration: 30,
            total_xp: 10,
            total_gold: 2,
            completed: true,
        };
        let child = NewWorkoutExercise {
            exercise_id: Uuid::new_v4(),
            sets: 1,
            reps: Some(10),
            weight: None,
            duration: None,
            distance: None,
            xp_earned: 10,
            gold_earned: 2,
        };

        assert!(store.insert_workout(&workout, &[child]).await.is_err());

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM workouts WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&store.pool)
            .await?;
        assert_eq!(count, 0, "parent row survived a failed child insert");

        delete_user(&store, user_id).await
    }

    #[tokio::test]
    async fn test_apply_workout_totals_returns_previous_date() -> Result<()> {
        let Some(store) = store().await? else {
            return Ok(());
        };
        let user_id = user(&store).await?;

        let delta = StatsDelta {
            xp: 40,
            gold: 8,
            workouts: 1,
            duration: 30,
        };
        let monday = Utc.with_ymd_and_hms(2025, 3, 3, 7, 30, 0).unwrap();
        let tuesday = Utc.with_ymd_and_hms(2025, 3, 4, 18, 0, 0).unwrap();

        let first = store.apply_workout_totals(user_id, &delta, monday).await?;
        assert_eq!(first.previous_last_workout, None);
        assert_eq!(first.user.last_workout_date, Some(monday));

        let second = store.apply_workout_totals(user_id, &delta, tuesday).await?;
        assert_eq!(second.previous_last_workout, Some(monday));
        assert_eq!(second.user.last_workout_date, Some(tuesday));
        assert_eq!(second.user.xp, 80);
        assert_eq!(second.user.total_workouts, 2);

        delete_user(&store, user_id).await
    }

    #[tokio::test]
    async fn test_promote_level_refuses_stale_level() -> Result<()> {
        let Some(store) = store().await? else {
            return Ok(());
        };
        let user_id = user(&store).await?;

        let delta = StatsDelta {
            xp: 500,
            ..Default::default()
        };
        store.apply_workout_totals(user_id, &delta, Utc::now()).await?;

        assert_eq!(store.promote_level(user_id, 1, 100).await?, Some(2));
        // A second writer that also observed level 1 must not promote again
        assert_eq!(store.promote_level(user_id, 1, 100).await?, None);
        // Not enough experience
        assert_eq!(store.promote_level(user_id, 2, 1_000).await?, None);

        let user = store.find_user(user_id).await?;
        assert_eq!(user.map(|u| u.level), Some(2));

        delete_user(&store, user_id).await
    }
}
