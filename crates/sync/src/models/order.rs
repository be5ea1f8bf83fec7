//! Order domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use simply_orders_core::{
    ExternalOrderId, ExternalProductId, OrderId, OrderItemId, OrderStatus, UserId,
};

use super::user::UserUpsert;

/// Postal address stored on an order.
///
/// All fields are plain strings; the platform reports missing parts as empty
/// strings and so do we.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub first_name: String,
    pub last_name: String,
    pub address_1: String,
    pub address_2: String,
    pub city: String,
    pub state: String,
    pub postcode: String,
    pub country: String,
}

/// Shipment tracking details resolved for an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tracking {
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    /// Only set when both the number and the carrier are known.
    pub tracking_url: Option<String>,
}

impl Tracking {
    /// Returns `true` if nothing was resolved.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.tracking_number.is_none() && self.carrier.is_none()
    }
}

/// A locally stored order (domain type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub external_order_id: ExternalOrderId,
    pub order_number: String,
    pub customer_id: Option<UserId>,
    pub customer_email: String,
    pub status: OrderStatus,
    pub total: Decimal,
    pub currency: String,
    pub date_created: Option<DateTime<Utc>>,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub payment_method: Option<String>,
    pub customer_note: Option<String>,
    #[serde(flatten)]
    pub tracking: Tracking,
    /// Set once by a backfill and never cleared.
    pub is_historical: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert-or-update input for an [`Order`], keyed on `external_order_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderUpsert {
    pub external_order_id: ExternalOrderId,
    pub order_number: String,
    /// Filled in by the store once the customer's user record is known.
    pub customer_id: Option<UserId>,
    pub customer_email: String,
    pub status: OrderStatus,
    pub total: Decimal,
    pub currency: String,
    pub date_created: Option<DateTime<Utc>>,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub payment_method: Option<String>,
    pub customer_note: Option<String>,
    pub tracking: Tracking,
    pub is_historical: bool,
}

/// A line item belonging to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub external_product_id: ExternalProductId,
    pub product_name: String,
    pub sku: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub product_image: Option<String>,
}

/// A line item to be written for an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub external_product_id: ExternalProductId,
    pub product_name: String,
    pub sku: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub product_image: Option<String>,
}

/// An order together with its line items, as returned by lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Output of the order normalizer: everything one platform order writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedOrder {
    /// User record to upsert before the order, for registered customers.
    pub customer: Option<UserUpsert>,
    pub order: OrderUpsert,
    /// `None` leaves stored items untouched; `Some(vec![])` clears them.
    pub items: Option<Vec<NewOrderItem>>,
}

/// What happened to an order's line items during a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemsSync {
    /// Items were replaced with this many rows.
    Replaced(usize),
    /// The payload carried no line items field.
    Untouched,
    /// The item write failed; the order header was kept.
    Failed,
}

/// Result of persisting one [`NormalizedOrder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedOrder {
    pub order: Order,
    pub items: ItemsSync,
}
