//! `PostgreSQL` implementation of [`OrderStore`].

use sqlx::{Connection, PgPool};
use tracing::{instrument, warn};

use simply_orders_core::{Email, OrderId, UserId};

use super::orders::OrderRepository;
use super::users::UserRepository;
use super::{OrderStore, RepositoryError};
use crate::models::{
    ItemsSync, LoginProfile, NewOrderItem, NormalizedOrder, Order, OrderItem, OrderUpsert,
    OrderWithItems, SavedOrder, User, UserUpsert,
};

/// Order store backed by a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl OrderStore for PgOrderStore {
    async fn upsert_user(&self, user: &UserUpsert) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let saved = UserRepository::new(&mut tx).upsert(user).await?;
        tx.commit().await?;
        Ok(saved)
    }

    async fn record_login(&self, email: &Email, profile: &LoginProfile) -> Result<User, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        UserRepository::new(&mut conn).record_login(email, profile).await
    }

    async fn upsert_order(&self, order: &OrderUpsert) -> Result<Order, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        OrderRepository::new(&mut conn).upsert(order).await
    }

    async fn replace_order_items(
        &self,
        order_id: OrderId,
        items: &[NewOrderItem],
    ) -> Result<Vec<OrderItem>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let written = OrderRepository::new(&mut tx)
            .replace_items(order_id, items)
            .await?;
        tx.commit().await?;
        Ok(written)
    }

    #[instrument(skip(self, orders), fields(count = orders.len()))]
    async fn save_historical_batch(
        &self,
        orders: &[NormalizedOrder],
    ) -> Result<Vec<SavedOrder>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut saved = Vec::with_capacity(orders.len());

        for normalized in orders {
            let mut upsert = normalized.order.clone();
            if let Some(customer) = &normalized.customer {
                // Savepoint: a user conflict only drops the link
                let mut savepoint = Connection::begin(&mut *tx).await?;
                let result = UserRepository::new(&mut savepoint).upsert(customer).await;
                match result {
                    Ok(user) => {
                        savepoint.commit().await?;
                        upsert.customer_id = Some(user.id);
                    }
                    Err(e) => {
                        savepoint.rollback().await?;
                        warn!(
                            external_order_id = %upsert.external_order_id,
                            error = %e,
                            "Failed to upsert historical order customer, saving without user link"
                        );
                    }
                }
            }

            let order = OrderRepository::new(&mut tx).upsert(&upsert).await?;

            let items = match &normalized.items {
                None => ItemsSync::Untouched,
                Some(items) => {
                    // Savepoint: a failed item write must not abort the batch
                    let mut savepoint = Connection::begin(&mut *tx).await?;
                    let result = OrderRepository::new(&mut savepoint)
                        .replace_items(order.id, items)
                        .await;
                    match result {
                        Ok(written) => {
                            savepoint.commit().await?;
                            ItemsSync::Replaced(written.len())
                        }
                        Err(e) => {
                            savepoint.rollback().await?;
                            warn!(
                                external_order_id = %order.external_order_id,
                                error = %e,
                                "Failed to replace historical order items, keeping order header"
                            );
                            ItemsSync::Failed
                        }
                    }
                }
            };

            saved.push(SavedOrder { order, items });
        }

        tx.commit().await?;
        Ok(saved)
    }

    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        UserRepository::new(&mut conn).get_by_email(email).await
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<OrderWithItems>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        OrderRepository::new(&mut conn).list_for_user(user_id).await
    }

    async fn orders_for_email(&self, email: &Email) -> Result<Vec<OrderWithItems>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        OrderRepository::new(&mut conn).list_for_email(email).await
    }

    async fn has_historical_orders(&self, email: &Email) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        OrderRepository::new(&mut conn).has_historical(email).await
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
