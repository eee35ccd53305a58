//! Apply the schema migrations to `DATABASE_URL`.
//!
//! Reads `.env` if present. Log level follows `RUST_LOG`.

use anyhow::Context;
use homeservice_core::LifecycleConfig;
use homeservice_postgres::{PostgresConfig, PostgresStore};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,homeservice_postgres=debug".into()),
        )
        .with(fmt::layer())
        .init();

    let config = PostgresConfig::from_env().context("loading database configuration")?;
    let lifecycle = LifecycleConfig::from_env();

    let store = PostgresStore::connect(&config, lifecycle.timezone)
        .await
        .context("connecting to PostgreSQL")?;
    store.migrate().await.context("applying migrations")?;

    tracing::info!("Migrations applied");
    Ok(())
}
