//! `PostgreSQL` backend for the household services broker.
//!
//! [`PostgresStore`] implements all three collaborator traits from
//! `homeservice-core` ([`RequestStore`], [`Directory`] and [`RatingLedger`])
//! over one connection pool, so a single value can back the whole engine:
//!
//! ```ignore
//! use homeservice_core::{LifecycleConfig, LifecycleEngine, LifecycleEnvironment};
//! use homeservice_postgres::{PostgresConfig, PostgresStore};
//!
//! let config = LifecycleConfig::from_env();
//! let store = PostgresStore::connect(&PostgresConfig::from_env()?, config.timezone).await?;
//! store.migrate().await?;
//!
//! let engine = LifecycleEngine::new(
//!     store.clone(),
//!     store.clone(),
//!     store,
//!     LifecycleEnvironment::production(config),
//! );
//! ```
//!
//! Multi-row writes (recording an offer, committing an approval, recording a
//! review) run in one transaction each. Single-row status changes are
//! conditional `UPDATE`s guarded by the status the engine read, so no lock
//! is held between calls.
//!
//! [`RequestStore`]: homeservice_core::RequestStore
//! [`Directory`]: homeservice_core::Directory
//! [`RatingLedger`]: homeservice_core::RatingLedger

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
mod directory;
mod rating_ledger;
mod request_store;
mod rows;

pub use config::{ConfigError, PostgresConfig};

use chrono::FixedOffset;
use homeservice_core::{Result, ServiceError};
use sqlx::{PgPool, Postgres, Transaction};

/// Request store, directory and rating ledger over a `PostgreSQL` pool.
///
/// Cloning shares the pool.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
    timezone: FixedOffset,
}

impl PostgresStore {
    /// Wrap an existing pool. Timestamps are returned in `timezone`.
    #[must_use]
    pub const fn new(pool: PgPool, timezone: FixedOffset) -> Self {
        Self { pool, timezone }
    }

    /// Validate `config` and open a pool.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Storage`] if the configuration is invalid or
    /// the connection fails.
    pub async fn connect(config: &PostgresConfig, timezone: FixedOffset) -> Result<Self> {
        config
            .validate()
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        let pool = config
            .pool_options()
            .connect(&config.url)
            .await
            .map_err(|e| ServiceError::Storage(format!("Failed to connect: {e}")))?;

        tracing::info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Connected to PostgreSQL"
        );

        Ok(Self::new(pool, timezone))
    }

    /// Apply the bundled migrations.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Storage`] if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| ServiceError::Storage(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>> {
        self.pool.begin().await.map_err(storage_error)
    }
}

pub(crate) fn storage_error(e: sqlx::Error) -> ServiceError {
    ServiceError::Storage(e.to_string())
}

/// Commit on success, roll back and record the failure otherwise.
pub(crate) async fn finish<T>(
    tx: Transaction<'static, Postgres>,
    operation: &'static str,
    outcome: Result<T>,
) -> Result<T> {
    match outcome {
        Ok(value) => {
            tx.commit().await.map_err(storage_error)?;
            Ok(value)
        }
        Err(error) => {
            if let Err(rollback) = tx.rollback().await {
                tracing::warn!(operation, error = %rollback, "Rollback failed");
            }
            if error.is_user_error() {
                tracing::warn!(operation, error = %error, "Transaction rolled back");
            } else {
                tracing::error!(operation, error = %error, "Transaction rolled back");
            }
            metrics::counter!("storage.rollback", "operation" => operation).increment(1);
            Err(error)
        }
    }
}
