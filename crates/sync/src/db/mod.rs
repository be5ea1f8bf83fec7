//! Order store.
//!
//! # Database: `simply_orders`
//!
//! Mirrors WooCommerce customers and orders for the companion app. The
//! platform is the source of truth; rows are only ever upserted from its
//! data and never hard-deleted here.
//!
//! ## Tables (schema `sync`)
//!
//! - `user` - Customers, unique by email and by WooCommerce customer id
//! - `order` - Orders, unique by WooCommerce order id
//! - `order_item` - Line items, owned by their order
//!
//! # Migrations
//!
//! Migrations are stored in `crates/sync/migrations/` and run via:
//! ```bash
//! cargo run -p simply-orders-cli -- migrate
//! ```

mod memory;
mod orders;
mod postgres;
mod users;

use std::future::Future;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::warn;

use simply_orders_core::{Email, OrderId, UserId};

use crate::models::{
    ItemsSync, LoginProfile, NewOrderItem, NormalizedOrder, Order, OrderItem, OrderUpsert,
    OrderWithItems, SavedOrder, User, UserUpsert,
};

pub use memory::{MemoryStore, StoreStats};
pub use postgres::PgOrderStore;

/// Errors that can occur during repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map unique violations to `Conflict`, everything else to `Database`.
    pub(crate) fn from_write(error: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = error
            && db_err.is_unique_violation()
        {
            return Self::Conflict(format!("{what}: {}", db_err.message()));
        }
        Self::Database(error)
    }
}

/// Persistence for users, orders and line items.
///
/// Every write is an idempotent upsert keyed by a platform identifier, so
/// replaying the same input leaves the store unchanged apart from
/// `updated_at`.
pub trait OrderStore: Send + Sync + 'static {
    /// Insert or update a user, keyed on the external customer id when
    /// present and on email otherwise.
    fn upsert_user(
        &self,
        user: &UserUpsert,
    ) -> impl Future<Output = Result<User, RepositoryError>> + Send;

    /// Record an authenticated signup or login for an email.
    ///
    /// Creates the user if the email is new, otherwise fills in any profile
    /// fields given. Sets `last_login` to now either way. Never touches the
    /// external customer id.
    fn record_login(
        &self,
        email: &Email,
        profile: &LoginProfile,
    ) -> impl Future<Output = Result<User, RepositoryError>> + Send;

    /// Insert or update an order, keyed on the external order id.
    ///
    /// `is_historical` only ever goes from false to true. Tracking fields are
    /// kept when the update carries no tracking number.
    fn upsert_order(
        &self,
        order: &OrderUpsert,
    ) -> impl Future<Output = Result<Order, RepositoryError>> + Send;

    /// Atomically replace all line items of an order.
    fn replace_order_items(
        &self,
        order_id: OrderId,
        items: &[NewOrderItem],
    ) -> impl Future<Output = Result<Vec<OrderItem>, RepositoryError>> + Send;

    /// Persist all orders of one backfill in a single transaction.
    ///
    /// Either every order header is written or none is. User links and line
    /// items are written per order on a best-effort basis.
    fn save_historical_batch(
        &self,
        orders: &[NormalizedOrder],
    ) -> impl Future<Output = Result<Vec<SavedOrder>, RepositoryError>> + Send;

    /// Find a user by (normalized) email.
    fn find_user_by_email(
        &self,
        email: &Email,
    ) -> impl Future<Output = Result<Option<User>, RepositoryError>> + Send;

    /// Orders linked to a user, newest first, with line items.
    fn orders_for_user(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<OrderWithItems>, RepositoryError>> + Send;

    /// Orders placed with an email, newest first, with line items.
    fn orders_for_email(
        &self,
        email: &Email,
    ) -> impl Future<Output = Result<Vec<OrderWithItems>, RepositoryError>> + Send;

    /// Whether any historical order exists for an email.
    fn has_historical_orders(
        &self,
        email: &Email,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Check that the store is reachable.
    fn ping(&self) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Persist one normalized order: user, then order, then line items.
    ///
    /// The user write is best-effort: if it fails the order is saved without
    /// a user link. A failed item write is logged and reported as
    /// [`ItemsSync::Failed`]; the order header stays committed.
    ///
    /// # Errors
    ///
    /// Returns the order write error.
    fn save_order(
        &self,
        normalized: &NormalizedOrder,
    ) -> impl Future<Output = Result<SavedOrder, RepositoryError>> + Send {
        async move {
            let mut upsert = normalized.order.clone();
            if let Some(customer) = &normalized.customer {
                match self.upsert_user(customer).await {
                    Ok(user) => upsert.customer_id = Some(user.id),
                    Err(e) => warn!(
                        external_order_id = %upsert.external_order_id,
                        error = %e,
                        "Failed to upsert order customer, saving order without user link"
                    ),
                }
            }

            let order = self.upsert_order(&upsert).await?;

            let items = match &normalized.items {
                None => ItemsSync::Untouched,
                Some(items) => match self.replace_order_items(order.id, items).await {
                    Ok(written) => ItemsSync::Replaced(written.len()),
                    Err(e) => {
                        warn!(
                            order_id = %order.id,
                            external_order_id = %order.external_order_id,
                            error = %e,
                            "Failed to replace order items, keeping order header"
                        );
                        ItemsSync::Failed
                    }
                },
            };

            Ok(SavedOrder { order, items })
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
