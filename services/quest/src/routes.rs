//! Quest service routes

use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, patch, post},
};
use chrono::{Duration, Utc};
use serde_json::json;
use tracing::error;

use crate::{
    error::{ApiError, ApiResult},
    leaderboard,
    middleware::{AuthUser, auth_middleware},
    models::{
        AvatarUpdate, CompleteWorkoutRequest, DailyStatsQuery, LeaderboardQuery, UserProfile,
        WorkoutHistoryQuery, exercise::ExerciseQuery,
    },
    reconcile,
    state::AppState,
};

/// Create the router for the quest service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/me", get(get_profile))
        .route("/me/avatar", patch(update_avatar))
        .route("/exercises", get(list_exercises))
        .route("/exercises/sync", post(sync_exercises))
        .route("/workouts", post(complete_workout).get(list_workouts))
        .route("/stats/daily", get(daily_stats))
        .route("/stats/muscles", get(muscle_stats))
        .route("/leaderboard", get(get_leaderboard))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/health/db", get(database_health))
        .merge(protected_routes)
        .with_state(state)
}

fn internal(context: &str, e: anyhow::Error) -> ApiError {
    error!("{}: {}", context, e);
    ApiError::InternalServerError
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "quest"
    }))
}

/// Storage connectivity
pub async fn database_health(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.health_check().await {
        Ok(true) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "database": "connected" })),
        ),
        Ok(false) | Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "error", "database": "unreachable" })),
        ),
    }
}

/// The caller's profile, provisioned on first read
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<UserProfile>> {
    let profile = state
        .store
        .ensure_user(user.id, &user.email)
        .await
        .map_err(|e| internal("Failed to load profile", e))?;

    Ok(Json(profile.into()))
}

pub async fn update_avatar(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(update): Json<AvatarUpdate>,
) -> ApiResult<Json<UserProfile>> {
    update.validate().map_err(ApiError::BadRequest)?;

    state
        .store
        .ensure_user(user.id, &user.email)
        .await
        .map_err(|e| internal("Failed to provision profile", e))?;
    let updated = state
        .store
        .update_avatar(user.id, &update)
        .await
        .map_err(|e| internal("Failed to update avatar", e))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(updated.into()))
}

/// Durable exercise catalog
pub async fn list_exercises(
    State(state): State<AppState>,
    Query(query): Query<ExerciseQuery>,
) -> ApiResult<impl IntoResponse> {
    let exercises = state
        .store
        .list_exercises()
        .await
        .map_err(|e| internal("Failed to list exercises", e))?;

    Ok(Json(query.apply(exercises)))
}

/// Seed every bundled exercise into storage
pub async fn sync_exercises(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let exercises = reconcile::sync_catalog(state.store.as_ref())
        .await
        .map_err(|e| internal("Failed to sync exercise catalog", e))?;

    Ok(Json(exercises))
}

/// Commit a completed workout
pub async fn complete_workout(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CompleteWorkoutRequest>,
) -> ApiResult<impl IntoResponse> {
    request.validate().map_err(ApiError::BadRequest)?;

    let receipt = state
        .pipeline
        .commit_workout(user.id, &user.email, &request)
        .await
        .map_err(|e| {
            error!("Failed to save workout for user {}: {}", user.id, e);
            ApiError::from(e)
        })?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

/// The caller's workouts, newest first
pub async fn list_workouts(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<WorkoutHistoryQuery>,
) -> ApiResult<impl IntoResponse> {
    let workouts = state
        .store
        .list_workouts(user.id, query.limit())
        .await
        .map_err(|e| internal("Failed to list workouts", e))?;

    Ok(Json(workouts))
}

pub async fn daily_stats(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<DailyStatsQuery>,
) -> ApiResult<impl IntoResponse> {
    let since = Utc::now().date_naive() - Duration::days(i64::from(query.days()) - 1);
    let stats = state
        .store
        .daily_stats(user.id, since)
        .await
        .map_err(|e| internal("Failed to load daily stats", e))?;

    Ok(Json(stats))
}

pub async fn muscle_stats(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let stats = state
        .store
        .muscle_stats(user.id)
        .await
        .map_err(|e| internal("Failed to load muscle stats", e))?;

    Ok(Json(stats))
}

pub async fn get_leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> ApiResult<impl IntoResponse> {
    let entries = leaderboard::leaderboard(state.store.as_ref(), &query, state.leaderboard_limit)
        .await
        .map_err(|e| internal("Failed to load leaderboard", e))?;

    Ok(Json(entries))
}
