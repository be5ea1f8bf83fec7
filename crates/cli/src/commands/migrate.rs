//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! so-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `SYNC_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Migrations live in `crates/sync/migrations/` and are embedded at build
//! time.

use secrecy::ExposeSecret;
use sqlx::PgPool;
use thiserror::Error;

use simply_orders_sync::config::{ConfigError, get_database_url};

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run the order sync database migrations.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the database is
/// unreachable, or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    dotenvy::dotenv().ok();

    let database_url = get_database_url("SYNC_DATABASE_URL")?;

    tracing::info!("Connecting to sync database...");
    let pool = PgPool::connect(database_url.expose_secret()).await?;

    tracing::info!("Running sync migrations...");
    sqlx::migrate!("../sync/migrations").run(&pool).await?;

    tracing::info!("Sync migrations complete!");
    Ok(())
}
