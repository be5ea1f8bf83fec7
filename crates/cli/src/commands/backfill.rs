//! Manual historical backfill.
//!
//! Runs the same backfill as `POST /api/historical-orders`, including the
//! per-email rate limit and the one-time guard, against the configured
//! database and WooCommerce site.
//!
//! # Usage
//!
//! ```bash
//! so-cli backfill -e customer@example.com
//! so-cli backfill -e customer@example.com --before 2024-03-01T00:00:00Z
//! ```

use thiserror::Error;

use simply_orders_sync::config::{ConfigError, SyncConfig};
use simply_orders_sync::db;
use simply_orders_sync::services::backfill::parse_cutover;
use simply_orders_sync::services::{BackfillError, BackfillRequest};
use simply_orders_sync::state::AppState;
use simply_orders_sync::woocommerce::WooCommerceError;

/// Errors that can occur during a manual backfill.
#[derive(Debug, Error)]
pub enum BackfillCommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("WooCommerce client error: {0}")]
    Client(#[from] WooCommerceError),

    #[error(transparent)]
    Backfill(#[from] BackfillError),

    #[error("Failed to render result: {0}")]
    Output(#[from] serde_json::Error),
}

/// Import historical orders for `email` and print the result as JSON.
///
/// # Errors
///
/// Returns an error if configuration is incomplete or the backfill fails.
pub async fn run(email: &str, before: Option<&str>) -> Result<(), BackfillCommandError> {
    let config = SyncConfig::from_env()?;
    let cutover = before.map(parse_cutover).transpose()?;

    tracing::info!("Connecting to sync database...");
    let pool = db::create_pool(&config.database_url).await?;
    let state = AppState::from_config(&config, pool)?;

    tracing::info!(email, ?cutover, "Running historical backfill");
    let result = state
        .backfill()
        .backfill(BackfillRequest {
            email: email.to_owned(),
            cutover,
        })
        .await?;

    tracing::info!(count = result.count, cached = result.cached, "{}", result.message);

    #[allow(clippy::print_stdout)]
    {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }

    Ok(())
}
