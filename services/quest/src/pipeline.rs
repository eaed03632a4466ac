//! Workout completion pipeline
//!
//! A commit provisions the user, reconciles the exercises, writes the workout
//! and its exercises in one transaction, and then runs the progression steps.
//! Progression steps run only after the workout is stored and never undo it:
//! their failures are logged and surface as absent fields in the receipt.

use chrono::{DateTime, Utc};
use std::{collections::BTreeMap, sync::Arc};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    models::{
        CompleteWorkoutRequest, ExerciseType, MuscleGroup, NewWorkout, NewWorkoutExercise,
        StatsDelta, TotalsUpdate, User, Workout, WorkoutReceipt,
    },
    progression::{self, StreakChange},
    reconcile::{Reconciler, ResolvedExercise},
    repositories::FitnessStore,
};

/// Every performed exercise counts as one set
const SETS_PER_ENTRY: i32 = 1;

/// Why a workout could not be committed
#[derive(Error, Debug)]
pub enum CommitError {
    #[error("failed to provision user profile: {0}")]
    Provisioning(#[source] anyhow::Error),

    #[error("failed to read exercise catalog: {0}")]
    Catalog(#[source] anyhow::Error),

    #[error("none of the {submitted} submitted exercises could be matched to the catalog")]
    NoValidExercises { submitted: usize },

    #[error("failed to store workout: {0}")]
    Persistence(#[source] anyhow::Error),
}

/// Runs workout commits against a store
#[derive(Clone)]
pub struct WorkoutPipeline {
    store: Arc<dyn FitnessStore>,
}

impl WorkoutPipeline {
    pub fn new(store: Arc<dyn FitnessStore>) -> Self {
        Self { store }
    }

    /// Commit a completed workout for the user at the current time
    pub async fn commit_workout(
        &self,
        user_id: Uuid,
        email: &str,
        request: &CompleteWorkoutRequest,
    ) -> Result<WorkoutReceipt, CommitError> {
        self.commit_workout_at(user_id, email, request, Utc::now())
            .await
    }

    /// Commit a completed workout as if it happened at `now`
    pub async fn commit_workout_at(
        &self,
        user_id: Uuid,
        email: &str,
        request: &CompleteWorkoutRequest,
        now: DateTime<Utc>,
    ) -> Result<WorkoutReceipt, CommitError> {
        self.store
            .ensure_user(user_id, email)
            .await
            .map_err(CommitError::Provisioning)?;

        let mut reconciler = Reconciler::load(self.store.as_ref())
            .await
            .map_err(CommitError::Catalog)?;
        let reconciliation = reconciler.resolve(&request.exercises).await;

        if reconciliation.resolved.is_empty() {
            return Err(CommitError::NoValidExercises {
                submitted: request.exercises.len(),
            });
        }

        let exercises: Vec<NewWorkoutExercise> = reconciliation
            .resolved
            .iter()
            .map(workout_exercise)
            .collect();
        let workout = NewWorkout {
            user_id,
            title: request.title(),
            date: now,
            duration: request.duration,
            total_xp: exercises.iter().map(|e| e.xp_earned).sum(),
            total_gold: exercises.iter().map(|e| e.gold_earned).sum(),
            completed: request.completed,
        };

        let saved = self
            .store
            .insert_workout(&workout, &exercises)
            .await
            .map_err(CommitError::Persistence)?;
        info!(
            "Stored workout {} for user {} with {} exercises ({} dropped)",
            saved.id,
            user_id,
            saved.exercises.len(),
            reconciliation.dropped
        );

        let totals = self.update_totals(&saved, now).await;
        self.update_muscle_stats(user_id, &reconciliation.resolved)
            .await;
        let streak = match &totals {
            Some(totals) => self.update_streak(totals, now).await,
            None => None,
        };
        let (level, leveled_up) = match &totals {
            Some(totals) => self.check_level(&totals.user).await,
            None => (None, false),
        };

        Ok(WorkoutReceipt {
            success: true,
            workout: saved,
            dropped_exercises: reconciliation.dropped,
            streak,
            level,
            leveled_up,
        })
    }

    /// Cumulative totals, then the daily rollup. The rollup is only credited
    /// once the totals are, so the two never disagree about a workout.
    async fn update_totals(&self, workout: &Workout, now: DateTime<Utc>) -> Option<TotalsUpdate> {
        let delta = StatsDelta {
            xp: workout.total_xp,
            gold: workout.total_gold,
            workouts: 1,
            duration: workout.duration,
        };

        let totals = match self
            .store
            .apply_workout_totals(workout.user_id, &delta, now)
            .await
        {
            Ok(totals) => totals,
            Err(e) => {
                error!(
                    "Failed to update totals for user {} after workout {}: {}",
                    workout.user_id, workout.id, e
                );
                return None;
            }
        };

        if let Err(e) = self
            .store
            .record_daily_stats(workout.user_id, now.date_naive(), &delta)
            .await
        {
            warn!(
                "Failed to update daily stats for user {}: {}",
                workout.user_id, e
            );
        }

        Some(totals)
    }

    async fn update_muscle_stats(&self, user_id: Uuid, resolved: &[ResolvedExercise]) {
        let mut groups: BTreeMap<MuscleGroup, (i32, i32)> = BTreeMap::new();
        for exercise in resolved {
            let (sets, xp) = groups.entry(exercise.entry.muscle_group).or_default();
            *sets += SETS_PER_ENTRY;
            *xp += exercise.entry.xp_per_set * SETS_PER_ENTRY;
        }

        for (group, (sets, xp)) in groups {
            if let Err(e) = self
                .store
                .record_muscle_stats(user_id, group, sets, xp)
                .await
            {
                warn!(
                    "Failed to update {} stats for user {}: {}",
                    group, user_id, e
                );
            }
        }
    }

    async fn update_streak(&self, totals: &TotalsUpdate, now: DateTime<Utc>) -> Option<i32> {
        let change = StreakChange::between(totals.previous_last_workout, now);
        match self.store.apply_streak(totals.user.id, change).await {
            Ok(streak) => Some(streak),
            Err(e) => {
                warn!("Failed to update streak for user {}: {}", totals.user.id, e);
                None
            }
        }
    }

    /// One promotion at most, applied only if nobody promoted in between
    async fn check_level(&self, user: &User) -> (Option<i32>, bool) {
        if progression::next_level(user.level, user.xp).is_none() {
            return (Some(user.level), false);
        }

        let threshold = progression::level_threshold(user.level);
        match self.store.promote_level(user.id, user.level, threshold).await {
            Ok(Some(level)) => {
                info!("User {} reached level {}", user.id, level);
                (Some(level), true)
            }
            Ok(None) => {
                // A concurrent commit already promoted from this level
                let level = match self.store.find_user(user.id).await {
                    Ok(current) => current.map(|u| u.level),
                    Err(e) => {
                        warn!("Failed to re-read level for user {}: {}", user.id, e);
                        None
                    }
                };
                (level, false)
            }
            Err(e) => {
                error!("Failed to promote user {}: {}", user.id, e);
                (None, false)
            }
        }
    }
}

/// Child row for a resolved exercise, keeping only the measurements its type uses
fn workout_exercise(resolved: &ResolvedExercise) -> NewWorkoutExercise {
    let performed = &resolved.performed;
    let (reps, weight, duration, distance) = match resolved.entry.exercise_type {
        ExerciseType::Strength => (performed.reps, performed.weight, None, None),
        ExerciseType::Cardio => (None, None, performed.duration, performed.distance),
    };

    NewWorkoutExercise {
        exercise_id: resolved.exercise_id,
        sets: SETS_PER_ENTRY,
        reps,
        weight,
        duration,
        distance,
        xp_earned: resolved.entry.xp_per_set * SETS_PER_ENTRY,
        gold_earned: resolved.entry.gold_per_set * SETS_PER_ENTRY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PerformedExercise;
    use crate::repositories::MemoryStore;
    use chrono::{Duration, TimeZone};
    use tokio_test::{assert_err, assert_ok};

    const EMAIL: &str = "runner@example.com";

    fn setup() -> (MemoryStore, WorkoutPipeline) {
        let store = MemoryStore::new();
        let pipeline = WorkoutPipeline::new(Arc::new(store.clone()));
        (store, pipeline)
    }

    fn noon(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, day, 12, 0, 0).unwrap()
    }

    fn strength(id: &str) -> PerformedExercise {
        PerformedExercise {
            exercise_id: id.to_string(),
            reps: Some(8),
            weight: Some(60.0),
            duration: Some(99),
            distance: None,
        }
    }

    fn request(exercises: Vec<PerformedExercise>) -> CompleteWorkoutRequest {
        CompleteWorkoutRequest {
            title: None,
            duration: 45,
            completed: true,
            exercises,
        }
    }

    async fn seed_user(
        store: &MemoryStore,
        id: Uuid,
        level: i32,
        xp: i32,
        last: Option<DateTime<Utc>>,
        streak: i32,
    ) {
        let mut user = User::new(id, EMAIL, noon(1));
        user.level = level;
        user.xp = xp;
        user.last_workout_date = last;
        user.streak_count = streak;
        store.put_user(user).await;
    }

    #[tokio::test]
    async fn test_new_user_first_workout() {
        let (store, pipeline) = setup();
        let user_id = Uuid::new_v4();

        let receipt = assert_ok!(
            pipeline
                .commit_workout_at(
                    user_id,
                    EMAIL,
                    &request(vec![strength("bench-press"), strength("squat")]),
                    noon(10),
                )
                .await
        );

        assert_eq!(receipt.workout.exercises.len(), 2);
        assert_eq!(receipt.workout.total_xp, 40);
        assert_eq!(receipt.workout.total_gold, 20);
        assert_eq!(receipt.workout.title, "Workout");
        assert_eq!(receipt.streak, Some(1));
        assert_eq!(receipt.level, Some(1));
        assert!(!receipt.leveled_up);

        let user = store.find_user(user_id).await.unwrap().unwrap();
        assert_eq!(user.xp, 40);
        assert_eq!(user.gold, 20);
        assert_eq!(user.total_workouts, 1);
        assert_eq!(user.total_duration, 45);
        assert_eq!(user.streak_count, 1);
        assert_eq!(user.level, 1);
        assert_eq!(user.last_workout_date, Some(noon(10)));

        let daily = store.daily_stats(user_id, noon(10).date_naive()).await.unwrap();
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].xp_gained, 40);
        assert_eq!(daily[0].workouts_completed, 1);
    }

    #[tokio::test]
    async fn test_measurements_follow_exercise_type() {
        let (_store, pipeline) = setup();
        let run = PerformedExercise {
            exercise_id: "running".to_string(),
            reps: Some(3),
            weight: None,
            duration: Some(25),
            distance: Some(5.2),
        };

        let receipt = pipeline
            .commit_workout_at(
                Uuid::new_v4(),
                EMAIL,
                &request(vec![strength("deadlift"), run]),
                noon(10),
            )
            .await
            .unwrap();

        let lift = &receipt.workout.exercises[0];
        assert_eq!((lift.reps, lift.weight, lift.duration), (Some(8), Some(60.0), None));
        let run = &receipt.workout.exercises[1];
        assert_eq!((run.reps, run.duration, run.distance), (None, Some(25), Some(5.2)));
        assert!(receipt.workout.exercises.iter().all(|e| e.sets == 1));
    }

    #[tokio::test]
    async fn test_no_valid_exercises_writes_nothing() {
        let (store, pipeline) = setup();
        let user_id = Uuid::new_v4();

        let err = assert_err!(
            pipeline
                .commit_workout_at(user_id, EMAIL, &request(vec![strength("moonwalk")]), noon(10))
                .await
        );

        assert!(matches!(err, CommitError::NoValidExercises { submitted: 1 }));
        assert_eq!(store.workout_count().await, 0);
        let user = store.find_user(user_id).await.unwrap().unwrap();
        assert_eq!(user.total_workouts, 0);
    }

    #[tokio::test]
    async fn test_unknown_entries_are_dropped_from_saved_workout() {
        let (_store, pipeline) = setup();

        let receipt = pipeline
            .commit_workout_at(
                Uuid::new_v4(),
                EMAIL,
                &request(vec![strength("moonwalk"), strength("push-up")]),
                noon(10),
            )
            .await
            .unwrap();

        assert_eq!(receipt.dropped_exercises, 1);
        assert_eq!(receipt.workout.exercises.len(), 1);
        assert_eq!(receipt.workout.total_xp, 10);
    }

    #[tokio::test]
    async fn test_insert_failure_leaves_no_workout_or_progress() {
        let (store, pipeline) = setup();
        store.fail_on("insert_workout").await;
        let user_id = Uuid::new_v4();

        let err = pipeline
            .commit_workout_at(user_id, EMAIL, &request(vec![strength("squat")]), noon(10))
            .await
            .unwrap_err();

        assert!(matches!(err, CommitError::Persistence(_)));
        assert_eq!(store.workout_count().await, 0);
        assert_eq!(store.find_user(user_id).await.unwrap().unwrap().xp, 0);
    }

    #[tokio::test]
    async fn test_provisioning_failure_aborts() {
        let (store, pipeline) = setup();
        store.fail_on("ensure_user").await;

        let err = pipeline
            .commit_workout_at(Uuid::new_v4(), EMAIL, &request(vec![strength("squat")]), noon(10))
            .await
            .unwrap_err();

        assert!(matches!(err, CommitError::Provisioning(_)));
        assert_eq!(store.workout_count().await, 0);
    }

    #[tokio::test]
    async fn test_post_commit_failure_keeps_workout() {
        let (store, pipeline) = setup();
        store.fail_on("apply_streak").await;
        let user_id = Uuid::new_v4();

        let receipt = pipeline
            .commit_workout_at(user_id, EMAIL, &request(vec![strength("squat")]), noon(10))
            .await
            .unwrap();

        assert_eq!(receipt.streak, None);
        assert_eq!(store.workout_count().await, 1);
        assert_eq!(store.find_user(user_id).await.unwrap().unwrap().xp, 20);
    }

    #[tokio::test]
    async fn test_totals_failure_skips_dependent_steps() {
        let (store, pipeline) = setup();
        store.fail_on("apply_workout_totals").await;
        let user_id = Uuid::new_v4();

        let receipt = pipeline
            .commit_workout_at(user_id, EMAIL, &request(vec![strength("squat")]), noon(10))
            .await
            .unwrap();

        assert_eq!(store.workout_count().await, 1);
        assert_eq!((receipt.streak, receipt.level), (None, None));
        let daily = store.daily_stats(user_id, noon(10).date_naive()).await.unwrap();
        assert!(daily.is_empty());
    }

    #[tokio::test]
    async fn test_committing_twice_doubles_everything() {
        let (store, pipeline) = setup();
        let user_id = Uuid::new_v4();
        let body = request(vec![strength("squat")]);

        pipeline.commit_workout_at(user_id, EMAIL, &body, noon(10)).await.unwrap();
        pipeline.commit_workout_at(user_id, EMAIL, &body, noon(10)).await.unwrap();

        assert_eq!(store.workout_count().await, 2);
        let user = store.find_user(user_id).await.unwrap().unwrap();
        assert_eq!(user.xp, 40);
        assert_eq!(user.total_workouts, 2);
        assert_eq!(user.streak_count, 1);
        let daily = store.daily_stats(user_id, noon(10).date_naive()).await.unwrap();
        assert_eq!(daily[0].workouts_completed, 2);
    }

    #[tokio::test]
    async fn test_streak_transitions() {
        let cases = [
            (Some(noon(9)), 4, 5),
            (Some(noon(10) - Duration::hours(3)), 4, 4),
            (Some(noon(7)), 4, 0),
        ];

        for (last, streak, expected) in cases {
            let (store, pipeline) = setup();
            let user_id = Uuid::new_v4();
            seed_user(&store, user_id, 1, 0, last, streak).await;

            let receipt = pipeline
                .commit_workout_at(user_id, EMAIL, &request(vec![strength("plank")]), noon(10))
                .await
                .unwrap();

            assert_eq!(receipt.streak, Some(expected), "previous {:?}", last);
            let user = store.find_user(user_id).await.unwrap().unwrap();
            assert_eq!(user.last_workout_date, Some(noon(10)));
        }
    }

    #[tokio::test]
    async fn test_level_promotion_single_step() {
        // plank is worth 10 xp
        let cases = [(85, 1, false), (95, 2, true), (240, 2, true)];

        for (start_xp, level, leveled_up) in cases {
            let (store, pipeline) = setup();
            let user_id = Uuid::new_v4();
            seed_user(&store, user_id, 1, start_xp, None, 0).await;

            let receipt = pipeline
                .commit_workout_at(user_id, EMAIL, &request(vec![strength("plank")]), noon(10))
                .await
                .unwrap();

            assert_eq!(receipt.level, Some(level), "start xp {}", start_xp);
            assert_eq!(receipt.leveled_up, leveled_up);
            assert_eq!(store.find_user(user_id).await.unwrap().unwrap().level, level);
        }
    }

    #[tokio::test]
    async fn test_muscle_stats_grouped_per_workout() {
        let (store, pipeline) = setup();
        let user_id = Uuid::new_v4();

        pipeline
            .commit_workout_at(
                user_id,
                EMAIL,
                &request(vec![strength("squat"), strength("lunge"), strength("bench-press")]),
                noon(10),
            )
            .await
            .unwrap();

        let stats = store.muscle_stats(user_id).await.unwrap();
        let legs = stats
            .iter()
            .find(|s| s.muscle_group == MuscleGroup::Legs)
            .unwrap();
        assert_eq!((legs.sets_completed, legs.xp_earned), (2, 35));
        let chest = stats
            .iter()
            .find(|s| s.muscle_group == MuscleGroup::Chest)
            .unwrap();
        assert_eq!((chest.sets_completed, chest.xp_earned), (1, 20));
    }

    #[tokio::test]
    async fn test_reconciliation_creates_rows_once_across_commits() {
        let (store, pipeline) = setup();
        let body = request(vec![strength("pull-up")]);

        pipeline.commit_workout_at(Uuid::new_v4(), EMAIL, &body, noon(10)).await.unwrap();
        pipeline.commit_workout_at(Uuid::new_v4(), "b@example.com", &body, noon(10)).await.unwrap();

        let rows = store.list_exercises().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].matches_name("PULL-UP"));
    }
}
