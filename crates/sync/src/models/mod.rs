//! Domain models for the order sync service.
//!
//! These types are the normalized, store-facing shape of WooCommerce data.
//! Platform wire types live in [`crate::woocommerce::types`]; the
//! normalizer in [`crate::services::normalize`] converts between the two.

pub mod order;
pub mod user;

pub use order::{
    Address, ItemsSync, NewOrderItem, NormalizedOrder, Order, OrderItem, OrderUpsert,
    OrderWithItems, SavedOrder, Tracking,
};
pub use user::{LoginProfile, User, UserUpsert};
