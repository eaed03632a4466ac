//! Service configuration loaded from `QUEST_*` environment variables

use anyhow::{Context, Result};
use ::config::{Config, Environment};
use serde::Deserialize;

/// Where profiles, workouts and statistics are kept
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    /// Process memory, lost on restart
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub bind_addr: String,
    /// HS256 secret shared with the identity provider
    pub jwt_secret: String,
    pub storage: StorageBackend,
    pub run_migrations: bool,
    pub leaderboard_limit: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let config: AppConfig = Config::builder()
            .set_default("bind_addr", "0.0.0.0:3001")?
            .set_default("storage", "postgres")?
            .set_default("run_migrations", true)?
            .set_default("leaderboard_limit", 10)?
            .add_source(Environment::with_prefix("QUEST"))
            .build()?
            .try_deserialize()
            .context("Invalid QUEST_* configuration")?;

        if config.jwt_secret.trim().is_empty() {
            anyhow::bail!("QUEST_JWT_SECRET must not be empty");
        }

        Ok(config)
    }
}

#[cfg(test)]
impl AppConfig {
    pub fn test_default() -> Self {
        Self {
            bind_addr: "127.0.0.1:0".to_string(),
            jwt_secret: "test-secret".to_string(),
            storage: StorageBackend::Memory,
            run_migrations: false,
            leaderboard_limit: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    const VARS: [&str; 5] = [
        "QUEST_BIND_ADDR",
        "QUEST_JWT_SECRET",
        "QUEST_STORAGE",
        "QUEST_RUN_MIGRATIONS",
        "QUEST_LEADERBOARD_LIMIT",
    ];

    fn clear() {
        for var in VARS {
            unsafe { env::remove_var(var) };
        }
    }

    #[test]
    #[serial]
    fn test_defaults_with_secret() {
        clear();
        unsafe { env::set_var("QUEST_JWT_SECRET", "shh") };

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:3001");
        assert_eq!(config.jwt_secret, "shh");
        assert_eq!(config.storage, StorageBackend::Postgres);
        assert!(config.run_migrations);
        assert_eq!(config.leaderboard_limit, 10);

        clear();
    }

    #[test]
    #[serial]
    fn test_overrides() {
        clear();
        unsafe {
            env::set_var("QUEST_JWT_SECRET", "shh");
            env::set_var("QUEST_STORAGE", "memory");
            env::set_var("QUEST_RUN_MIGRATIONS", "false");
            env::set_var("QUEST_LEADERBOARD_LIMIT", "25");
        }

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.storage, StorageBackend::Memory);
        assert!(!config.run_migrations);
        assert_eq!(config.leaderboard_limit, 25);

        clear();
    }

    #[test]
    #[serial]
    fn test_secret_is_required() {
        clear();
        assert!(AppConfig::from_env().is_err());

        unsafe { env::set_var("QUEST_JWT_SECRET", "  ") };
        assert!(AppConfig::from_env().is_err());

        clear();
    }
}
