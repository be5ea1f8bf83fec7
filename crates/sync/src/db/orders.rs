//! Order and line item repository for database operations.
//!
//! Runs on a borrowed connection so callers decide the transaction scope.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgConnection, Postgres, QueryBuilder};

use simply_orders_core::{
    Email, ExternalOrderId, ExternalProductId, OrderId, OrderItemId, OrderStatus, UserId,
};

use super::RepositoryError;
use crate::models::{Address, NewOrderItem, Order, OrderItem, OrderUpsert, OrderWithItems, Tracking};

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    external_order_id: ExternalOrderId,
    order_number: String,
    customer_id: Option<UserId>,
    customer_email: String,
    status: String,
    total: Decimal,
    currency: String,
    date_created: Option<DateTime<Utc>>,
    shipping_address: Json<Address>,
    billing_address: Json<Address>,
    payment_method: Option<String>,
    customer_note: Option<String>,
    tracking_number: Option<String>,
    carrier: Option<String>,
    tracking_url: Option<String>,
    is_historical: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            external_order_id: row.external_order_id,
            order_number: row.order_number,
            customer_id: row.customer_id,
            customer_email: row.customer_email,
            status: OrderStatus::from(row.status),
            total: row.total,
            currency: row.currency,
            date_created: row.date_created,
            shipping_address: row.shipping_address.0,
            billing_address: row.billing_address.0,
            payment_method: row.payment_method,
            customer_note: row.customer_note,
            tracking: Tracking {
                tracking_number: row.tracking_number,
                carrier: row.carrier,
                tracking_url: row.tracking_url,
            },
            is_historical: row.is_historical,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: OrderItemId,
    order_id: OrderId,
    external_product_id: ExternalProductId,
    product_name: String,
    sku: Option<String>,
    quantity: i32,
    unit_price: Decimal,
    total_price: Decimal,
    product_image: Option<String>,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            id: row.id,
            order_id: row.order_id,
            external_product_id: row.external_product_id,
            product_name: row.product_name,
            sku: row.sku,
            quantity: row.quantity,
            unit_price: row.unit_price,
            total_price: row.total_price,
            product_image: row.product_image,
        }
    }
}

/// Repository for order database operations.
pub(super) struct OrderRepository<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> OrderRepository<'c> {
    /// Create a new order repository.
    pub(super) const fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    /// Insert or update an order in a single statement.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the statement fails.
    pub(super) async fn upsert(&mut self, order: &OrderUpsert) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            INSERT INTO sync.order AS o (
                external_order_id, order_number, customer_id, customer_email, status,
                total, currency, date_created, shipping_address, billing_address,
                payment_method, customer_note, tracking_number, carrier, tracking_url,
                is_historical
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (external_order_id) DO UPDATE SET
                order_number = EXCLUDED.order_number,
                customer_id = COALESCE(EXCLUDED.customer_id, o.customer_id),
                customer_email = EXCLUDED.customer_email,
                status = EXCLUDED.status,
                total = EXCLUDED.total,
                currency = EXCLUDED.currency,
                date_created = COALESCE(EXCLUDED.date_created, o.date_created),
                shipping_address = EXCLUDED.shipping_address,
                billing_address = EXCLUDED.billing_address,
                payment_method = EXCLUDED.payment_method,
                customer_note = EXCLUDED.customer_note,
                tracking_number = CASE WHEN EXCLUDED.tracking_number IS NULL
                    THEN o.tracking_number ELSE EXCLUDED.tracking_number END,
                carrier = CASE WHEN EXCLUDED.tracking_number IS NULL
                    THEN o.carrier ELSE EXCLUDED.carrier END,
                tracking_url = CASE WHEN EXCLUDED.tracking_number IS NULL
                    THEN o.tracking_url ELSE EXCLUDED.tracking_url END,
                is_historical = o.is_historical OR EXCLUDED.is_historical,
                updated_at = now()
            RETURNING id, external_order_id, order_number, customer_id, customer_email, status,
                      total, currency, date_created, shipping_address, billing_address,
                      payment_method, customer_note, tracking_number, carrier, tracking_url,
                      is_historical, created_at, updated_at
            ",
        )
        .bind(order.external_order_id)
        .bind(&order.order_number)
        .bind(order.customer_id)
        .bind(&order.customer_email)
        .bind(order.status.as_str())
        .bind(order.total)
        .bind(&order.currency)
        .bind(order.date_created)
        .bind(Json(&order.shipping_address))
        .bind(Json(&order.billing_address))
        .bind(order.payment_method.as_deref())
        .bind(order.customer_note.as_deref())
        .bind(order.tracking.tracking_number.as_deref())
        .bind(order.tracking.carrier.as_deref())
        .bind(order.tracking.tracking_url.as_deref())
        .bind(order.is_historical)
        .fetch_one(&mut *self.conn)
        .await
        .map_err(|e| RepositoryError::from_write(e, "order"))?;

        Ok(row.into())
    }

    /// Delete and re-insert all line items of an order.
    ///
    /// Must run inside a transaction (or savepoint) so readers never see a
    /// partial item set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if either statement fails.
    pub(super) async fn replace_items(
        &mut self,
        order_id: OrderId,
        items: &[NewOrderItem],
    ) -> Result<Vec<OrderItem>, RepositoryError> {
        sqlx::query("DELETE FROM sync.order_item WHERE order_id = $1")
            .bind(order_id)
            .execute(&mut *self.conn)
            .await?;

        if items.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(
            "INSERT INTO sync.order_item (order_id, external_product_id, product_name, sku, \
             quantity, unit_price, total_price, product_image) ",
        );
        builder.push_values(items, |mut row, item| {
            row.push_bind(order_id)
                .push_bind(item.external_product_id)
                .push_bind(item.product_name.clone())
                .push_bind(item.sku.clone())
                .push_bind(item.quantity)
                .push_bind(item.unit_price)
                .push_bind(item.total_price)
                .push_bind(item.product_image.clone());
        });
        builder.push(
            " RETURNING id, order_id, external_product_id, product_name, sku, quantity, \
             unit_price, total_price, product_image",
        );

        let rows = builder
            .build_query_as::<OrderItemRow>()
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(rows.into_iter().map(OrderItem::from).collect())
    }

    /// Orders linked to a user id, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub(super) async fn list_for_user(
        &mut self,
        user_id: UserId,
    ) -> Result<Vec<OrderWithItems>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, external_order_id, order_number, customer_id, customer_email, status,
                   total, currency, date_created, shipping_address, billing_address,
                   payment_method, customer_note, tracking_number, carrier, tracking_url,
                   is_historical, created_at, updated_at
            FROM sync.order
            WHERE customer_id = $1
            ORDER BY date_created DESC NULLS LAST, id DESC
            ",
        )
        .bind(user_id)
        .fetch_all(&mut *self.conn)
        .await?;

        self.attach_items(rows).await
    }

    /// Orders placed with an email, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub(super) async fn list_for_email(
        &mut self,
        email: &Email,
    ) -> Result<Vec<OrderWithItems>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, external_order_id, order_number, customer_id, customer_email, status,
                   total, currency, date_created, shipping_address, billing_address,
                   payment_method, customer_note, tracking_number, carrier, tracking_url,
                   is_historical, created_at, updated_at
            FROM sync.order
            WHERE customer_email = $1
            ORDER BY date_created DESC NULLS LAST, id DESC
            ",
        )
        .bind(email)
        .fetch_all(&mut *self.conn)
        .await?;

        self.attach_items(rows).await
    }

    /// Whether a historical order exists for an email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub(super) async fn has_historical(&mut self, email: &Email) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM sync.order WHERE customer_email = $1 AND is_historical)",
        )
        .bind(email)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(exists)
    }

    async fn attach_items(
        &mut self,
        rows: Vec<OrderRow>,
    ) -> Result<Vec<OrderWithItems>, RepositoryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = rows.iter().map(|row| row.id.get()).collect();
        let item_rows = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT id, order_id, external_product_id, product_name, sku, quantity,
                   unit_price, total_price, product_image
            FROM sync.order_item
            WHERE order_id = ANY($1)
            ORDER BY id
            ",
        )
        .bind(&ids)
        .fetch_all(&mut *self.conn)
        .await?;

        let mut by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for row in item_rows {
            by_order.entry(row.order_id).or_default().push(row.into());
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let items = by_order.remove(&row.id).unwrap_or_default();
                OrderWithItems {
                    order: row.into(),
                    items,
                }
            })
            .collect())
    }
}
