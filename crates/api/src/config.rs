//! Process configuration read from `USERHUB_*` environment variables.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use userhub_infra::repository::eventing::{DEFAULT_EVENT_TOPIC, DEFAULT_PUBLISH_TIMEOUT};
use userhub_infra::repository::postgres::DEFAULT_STORE_TIMEOUT;

pub const BIND_ADDR: &str = "USERHUB_BIND_ADDR";
pub const DATABASE_URL: &str = "USERHUB_DATABASE_URL";
pub const REDIS_URL: &str = "USERHUB_REDIS_URL";
pub const EVENT_TOPIC: &str = "USERHUB_EVENT_TOPIC";
pub const PUBLISH_TIMEOUT_MS: &str = "USERHUB_PUBLISH_TIMEOUT_MS";
pub const STORE_TIMEOUT_MS: &str = "USERHUB_STORE_TIMEOUT_MS";
pub const DB_MAX_CONNECTIONS: &str = "USERHUB_DB_MAX_CONNECTIONS";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be a socket address, got {value:?}")]
    InvalidAddr { key: &'static str, value: String },

    #[error("{key} must be a positive integer, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Postgres connection string; `None` selects the in-memory repository.
    pub database_url: Option<String>,
    /// Redis connection string; `None` selects the in-memory channel.
    pub redis_url: Option<String>,
    pub event_topic: String,
    pub publish_timeout: Duration,
    pub store_timeout: Duration,
    pub db_max_connections: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            database_url: None,
            redis_url: None,
            event_topic: DEFAULT_EVENT_TOPIC.to_string(),
            publish_timeout: DEFAULT_PUBLISH_TIMEOUT,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let raw_addr = get(BIND_ADDR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw_addr.parse().map_err(|_| ConfigError::InvalidAddr {
            key: BIND_ADDR,
            value: raw_addr.clone(),
        })?;

        let defaults = Self::default();

        Ok(Self {
            bind_addr,
            database_url: get(DATABASE_URL),
            redis_url: get(REDIS_URL),
            event_topic: get(EVENT_TOPIC).unwrap_or(defaults.event_topic),
            publish_timeout: millis(PUBLISH_TIMEOUT_MS, get(PUBLISH_TIMEOUT_MS))?
                .unwrap_or(defaults.publish_timeout),
            store_timeout: millis(STORE_TIMEOUT_MS, get(STORE_TIMEOUT_MS))?.unwrap_or(defaults.store_timeout),
            db_max_connections: positive::<u32>(DB_MAX_CONNECTIONS, get(DB_MAX_CONNECTIONS))?
                .unwrap_or(defaults.db_max_connections),
        })
    }
}

fn positive<T>(key: &'static str, raw: Option<String>) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let Some(raw) = raw else {
        return Ok(None);
    };

    match raw.trim().parse::<T>() {
        Ok(n) if n > T::default() => Ok(Some(n)),
        _ => Err(ConfigError::InvalidNumber { key, value: raw }),
    }
}

fn millis(key: &'static str, raw: Option<String>) -> Result<Option<Duration>, ConfigError> {
    Ok(positive::<u64>(key, raw)?.map(Duration::from_millis))
}
