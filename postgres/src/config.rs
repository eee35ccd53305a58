//! Connection pool configuration.

use sqlx::postgres::PgPoolOptions;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Environment variable not set
    #[error("Environment variable not set: {0}")]
    EnvVarNotSet(String),

    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    Validation(String),
}

/// Database pool settings.
///
/// # Environment
///
/// | Variable                    | Default |
/// |-----------------------------|---------|
/// | `DATABASE_URL`              | required |
/// | `DATABASE_MAX_CONNECTIONS`  | 10 |
/// | `DATABASE_MIN_CONNECTIONS`  | 1 |
/// | `DATABASE_CONNECT_TIMEOUT`  | 10 (seconds) |
/// | `DATABASE_IDLE_TIMEOUT`     | 600 (seconds) |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    /// Connection string
    pub url: String,
    /// Maximum connections in the pool
    pub max_connections: u32,
    /// Connections kept open when idle
    pub min_connections: u32,
    /// Time allowed to acquire a connection
    pub connect_timeout: Duration,
    /// Time an unused connection stays open
    pub idle_timeout: Duration,
}

impl PostgresConfig {
    /// Defaults for everything but the URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(600),
        }
    }

    /// Load from the process environment.
    ///
    /// Optional variables that are absent or unparsable keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EnvVarNotSet`] if `DATABASE_URL` is missing.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let url = lookup("DATABASE_URL")
            .ok_or_else(|| ConfigError::EnvVarNotSet("DATABASE_URL".to_string()))?;
        let defaults = Self::new(url);
        let number = |key: &str| lookup(key).and_then(|s| s.trim().parse::<u64>().ok());

        Ok(Self {
            max_connections: number("DATABASE_MAX_CONNECTIONS")
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(defaults.max_connections),
            min_connections: number("DATABASE_MIN_CONNECTIONS")
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(defaults.min_connections),
            connect_timeout: number("DATABASE_CONNECT_TIMEOUT")
                .map_or(defaults.connect_timeout, Duration::from_secs),
            idle_timeout: number("DATABASE_IDLE_TIMEOUT")
                .map_or(defaults.idle_timeout, Duration::from_secs),
            ..defaults
        })
    }

    /// Set the maximum pool size.
    #[must_use]
    pub const fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the minimum pool size.
    #[must_use]
    pub const fn with_min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Set the acquire timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the idle timeout.
    #[must_use]
    pub const fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Check the settings are usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for an empty pool, a minimum above
    /// the maximum or a zero connect timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::Validation(
                "max_connections must be > 0".to_string(),
            ));
        }
        if self.min_connections > self.max_connections {
            return Err(ConfigError::Validation(format!(
                "min_connections ({}) exceeds max_connections ({})",
                self.min_connections, self.max_connections
            )));
        }
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::Validation(
                "connect_timeout must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Pool options carrying these settings.
    #[must_use]
    pub fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(self.connect_timeout)
            .idle_timeout(self.idle_timeout)
    }
}
