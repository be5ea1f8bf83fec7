//! User and order lookup by email.
//!
//! Orders are linked to a user only when the platform reported a registered
//! customer, so guest checkouts and orders synced before the user existed
//! are still found through the order's customer email.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

use simply_orders_core::{Email, EmailError};

use crate::db::{OrderStore, RepositoryError};
use crate::models::{OrderWithItems, User};

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("store error: {0}")]
    Repository(#[from] RepositoryError),
}

/// A user (if known) and their orders, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerOrders {
    pub user: Option<User>,
    pub orders: Vec<OrderWithItems>,
}

pub struct LookupService<S> {
    store: Arc<S>,
}

impl<S: OrderStore> LookupService<S> {
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Find the user for an email and their orders.
    ///
    /// Orders come from the user id when a user exists and has linked
    /// orders, otherwise from the order email.
    ///
    /// # Errors
    ///
    /// Returns `LookupError::InvalidEmail` before any store access, or the
    /// store error of a failed read.
    #[instrument(skip(self))]
    pub async fn orders_for(&self, email: &str) -> Result<CustomerOrders, LookupError> {
        let email = Email::parse(email)?;

        let Some(user) = self.store.find_user_by_email(&email).await? else {
            debug!("No user for email, falling back to order email");
            let orders = self.store.orders_for_email(&email).await?;
            return Ok(CustomerOrders { user: None, orders });
        };

        let mut orders = self.store.orders_for_user(user.id).await?;
        if orders.is_empty() {
            debug!(user_id = %user.id, "No linked orders, falling back to order email");
            orders = self.store.orders_for_email(&email).await?;
        }

        Ok(CustomerOrders {
            user: Some(user),
            orders,
        })
    }
}
