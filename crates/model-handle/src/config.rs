//! Handle and connection pool configuration
//!
//! Values come from defaults, the process environment, or any key lookup
//! passed to [`HandleConfig::from_lookup`].

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Page size used when neither the caller nor the environment provides one
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Connection pool configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    /// Seconds to wait for a connection
    pub acquire_timeout: u64,
    pub idle_timeout: Option<u64>,
    pub max_lifetime: Option<u64>,
    pub test_before_acquire: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: 30,
            idle_timeout: Some(600),  // 10 minutes
            max_lifetime: Some(1800), // 30 minutes
            test_before_acquire: true,
        }
    }
}

impl PoolConfig {
    pub fn acquire_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout)
    }
}

/// Top-level configuration for handles and the executors behind them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandleConfig {
    /// Connection string for the PostgreSQL executor
    pub database_url: Option<String>,
    /// Page size for `page_list` when the request does not carry one
    pub default_page_size: u64,
    pub pool: PoolConfig,
}

impl Default for HandleConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            default_page_size: DEFAULT_PAGE_SIZE,
            pool: PoolConfig::default(),
        }
    }
}

impl HandleConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> ModelResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> ModelResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()) {
            config.database_url = Some(url);
        }
        if let Some(size) = parse_var::<u64, _>(&lookup, "MODEL_HANDLE_PAGE_SIZE")? {
            if size == 0 {
                return Err(ModelError::Configuration(
                    "MODEL_HANDLE_PAGE_SIZE must be greater than zero".to_string(),
                ));
            }
            config.default_page_size = size;
        }
        if let Some(max) = parse_var::<u32, _>(&lookup, "DB_MAX_CONNECTIONS")? {
            config.pool.max_connections = max;
        }
        if let Some(min) = parse_var::<u32, _>(&lookup, "DB_MIN_CONNECTIONS")? {
            config.pool.min_connections = min;
        }
        if let Some(timeout) = parse_var::<u64, _>(&lookup, "DB_ACQUIRE_TIMEOUT")? {
            config.pool.acquire_timeout = timeout;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ModelResult<()> {
        if self.pool.min_connections > self.pool.max_connections {
            return Err(ModelError::Configuration(format!(
                "min_connections ({}) exceeds max_connections ({})",
                self.pool.min_connections, self.pool.max_connections
            )));
        }
        if self.default_page_size == 0 {
            return Err(ModelError::Configuration(
                "default_page_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// The database URL, or a configuration error when none is set
    pub fn require_database_url(&self) -> ModelResult<&str> {
        self.database_url
            .as_deref()
            .ok_or_else(|| ModelError::Configuration("DATABASE_URL is not set".to_string()))
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> ModelResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
            ModelError::Configuration(format!("Invalid value '{}' for {}: {}", raw, key, e))
        }),
        None => Ok(None),
    }
}
