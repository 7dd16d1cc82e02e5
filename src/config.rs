use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data_directory: PathBuf,
    pub database_enabled: bool,
    pub database_url: String,
    pub database_max_connections: u32,
    pub admin_timeout_secs: u64,
    pub event_channel_capacity: usize,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_directory: PathBuf::from("./data"),
            database_enabled: false,
            database_url: "postgresql://localhost:5432/clusterdeck".to_string(),
            database_max_connections: 5,
            admin_timeout_secs: 30,
            event_channel_capacity: 64,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // .env is only read when explicitly requested
        if env::var("USE_DOTENV").ok().as_deref() == Some("true") {
            dotenv::dotenv().ok();
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup, falling back to
    /// defaults for unset keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let config = Config {
            data_directory: lookup("DATA_DIRECTORY")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_directory),
            database_enabled: parse_or(&lookup, "DATABASE_ENABLED", defaults.database_enabled)?,
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            database_max_connections: parse_or(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            )?,
            admin_timeout_secs: parse_or(
                &lookup,
                "PULSAR_ADMIN_TIMEOUT_SECS",
                defaults.admin_timeout_secs,
            )?,
            event_channel_capacity: parse_or(
                &lookup,
                "CONNECTION_EVENT_CAPACITY",
                defaults.event_channel_capacity,
            )?,
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
        };

        if config.event_channel_capacity == 0 {
            anyhow::bail!("CONNECTION_EVENT_CAPACITY must be greater than zero");
        }

        Ok(config)
    }

    pub fn admin_timeout(&self) -> Duration {
        Duration::from_secs(self.admin_timeout_secs)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Invalid value '{}' for {}", raw, key)),
        None => Ok(default),
    }
}
