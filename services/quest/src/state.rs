//! Application state shared across handlers

use std::sync::Arc;

use crate::{middleware::JwtVerifier, pipeline::WorkoutPipeline, repositories::FitnessStore};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn FitnessStore>,
    pub pipeline: WorkoutPipeline,
    pub jwt: JwtVerifier,
    pub leaderboard_limit: u32,
}

impl AppState {
    pub fn new(store: Arc<dyn FitnessStore>, jwt_secret: &str, leaderboard_limit: u32) -> Self {
        Self {
            pipeline: WorkoutPipeline::new(store.clone()),
            store,
            jwt: JwtVerifier::new(jwt_secret),
            leaderboard_limit,
        }
    }
}
