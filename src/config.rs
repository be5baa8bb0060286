use std::collections::HashMap;
use thiserror::Error;

/// Path value selecting an ephemeral in-memory database.
pub const IN_MEMORY: &str = ":memory:";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub max_connections: u32,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_path: IN_MEMORY.to_string(),
            max_connections: 1,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_path = match env_map.get("DATABASE_PATH").map(|s| s.trim()) {
            None => IN_MEMORY.to_string(),
            Some("") => {
                return Err(ConfigError::InvalidValue(
                    "DATABASE_PATH".to_string(),
                    "must not be empty".to_string(),
                ))
            }
            Some(path) => path.to_string(),
        };

        let max_connections = env_map
            .get("DB_MAX_CONNECTIONS")
            .map(|s| s.as_str())
            .unwrap_or("1")
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "DB_MAX_CONNECTIONS".to_string(),
                    "must be a positive u32".to_string(),
                )
            })?;

        let mut config = Config {
            database_path,
            max_connections,
        };
        // Every in-memory connection opens its own database.
        if config.is_in_memory() {
            config.max_connections = 1;
        }
        Ok(config)
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path == IN_MEMORY
    }
}
