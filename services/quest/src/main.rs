use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod catalog;
mod config;
mod error;
mod leaderboard;
mod middleware;
mod models;
mod pipeline;
mod progression;
mod reconcile;
mod repositories;
mod routes;
mod state;

use common::database::{self, DatabaseConfig, init_pool};
use tokio::net::TcpListener;

use crate::{
    config::{AppConfig, StorageBackend},
    repositories::{FitnessStore, MemoryStore, PgStore},
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting quest service");

    let config = AppConfig::from_env()?;

    let store: Arc<dyn FitnessStore> = match config.storage {
        StorageBackend::Postgres => {
            let db_config = DatabaseConfig::from_env()?;
            let pool = init_pool(&db_config).await?;

            // Check database connectivity
            if database::health_check(&pool).await? {
                info!("Database connection successful");
            } else {
                anyhow::bail!("Failed to connect to database");
            }

            if config.run_migrations {
                database::run_migrations(&pool).await?;
            }

            Arc::new(PgStore::new(pool))
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage, data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    match reconcile::sync_catalog(store.as_ref()).await {
        Ok(exercises) => info!("Exercise catalog ready with {} entries", exercises.len()),
        Err(e) => warn!("Failed to seed exercise catalog, will retry lazily: {}", e),
    }

    let app_state = AppState::new(store, &config.jwt_secret, config.leaderboard_limit);
    let app = routes::create_router(app_state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("Quest service listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
