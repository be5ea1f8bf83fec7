//! In-process [`OrderStore`] for tests and local runs without a database.
//!
//! Follows the same upsert rules as the `PostgreSQL` store. Batch writes are
//! applied to a copy of the state and swapped in on success.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::warn;

use simply_orders_core::{Email, OrderId, OrderItemId, UserId};

use super::{OrderStore, RepositoryError};
use crate::models::{
    ItemsSync, LoginProfile, NewOrderItem, NormalizedOrder, Order, OrderItem, OrderUpsert,
    OrderWithItems, SavedOrder, User, UserUpsert,
};

/// Call counters, for asserting which paths touched the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub reads: usize,
    pub writes: usize,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: Vec<User>,
    orders: Vec<Order>,
    items: Vec<OrderItem>,
    last_user_id: i32,
    last_order_id: i32,
    last_item_id: i32,
}

/// Order store kept in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    reads: AtomicUsize,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
    fail_item_writes: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of read and write calls made so far.
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            reads: self.reads.load(Ordering::SeqCst),
            writes: self.writes.load(Ordering::SeqCst),
        }
    }

    /// Make every subsequent write fail with a database error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent line item write fail with a database error.
    pub fn set_fail_item_writes(&self, fail: bool) {
        self.fail_item_writes.store(fail, Ordering::SeqCst);
    }

    /// All stored users, by id.
    #[must_use]
    pub fn users(&self) -> Vec<User> {
        self.lock().users.clone()
    }

    /// All stored orders, by id.
    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        self.lock().orders.clone()
    }

    /// Stored line items of one order.
    #[must_use]
    pub fn items_for(&self, order_id: OrderId) -> Vec<OrderItem> {
        self.lock()
            .items
            .iter()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::SeqCst);
    }

    fn record_write(&self) -> Result<(), RepositoryError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(injected_failure());
        }
        Ok(())
    }

    fn check_item_write(&self) -> Result<(), RepositoryError> {
        if self.fail_item_writes.load(Ordering::SeqCst) {
            return Err(injected_failure());
        }
        Ok(())
    }
}

fn injected_failure() -> RepositoryError {
    RepositoryError::Database(sqlx::Error::Protocol("memory store write failure".to_string()))
}

impl MemoryState {
    fn upsert_user(&mut self, input: &UserUpsert) -> Result<User, RepositoryError> {
        let now = Utc::now();

        let by_external = input.external_customer_id.and_then(|external_id| {
            self.users
                .iter()
                .position(|u| u.external_customer_id == Some(external_id))
        });

        if let Some(index) = by_external {
            let email_taken = self
                .users
                .iter()
                .enumerate()
                .any(|(i, u)| i != index && u.email == input.email);
            if email_taken {
                return Err(RepositoryError::Conflict(format!(
                    "user email: {} belongs to another customer",
                    input.email
                )));
            }
        }

        let index = by_external.or_else(|| self.users.iter().position(|u| u.email == input.email));

        let Some(index) = index else {
            self.last_user_id += 1;
            let user = User {
                id: UserId::new(self.last_user_id),
                external_customer_id: input.external_customer_id,
                email: input.email.clone(),
                first_name: input.first_name.clone(),
                last_name: input.last_name.clone(),
                phone: input.phone.clone(),
                created_at: now,
                last_login: None,
                updated_at: now,
            };
            self.users.push(user.clone());
            return Ok(user);
        };

        let user = self
            .users
            .get_mut(index)
            .ok_or(RepositoryError::NotFound)?;
        user.email = input.email.clone();
        user.external_customer_id = user.external_customer_id.or(input.external_customer_id);
        if input.first_name.is_some() {
            user.first_name.clone_from(&input.first_name);
        }
        if input.last_name.is_some() {
            user.last_name.clone_from(&input.last_name);
        }
        if input.phone.is_some() {
            user.phone.clone_from(&input.phone);
        }
        user.updated_at = now;
        Ok(user.clone())
    }

    fn record_login(&mut self, email: &Email, profile: &LoginProfile) -> User {
        let now = Utc::now();

        if let Some(user) = self.users.iter_mut().find(|u| &u.email == email) {
            if profile.first_name.is_some() {
                user.first_name.clone_from(&profile.first_name);
            }
            if profile.last_name.is_some() {
                user.last_name.clone_from(&profile.last_name);
            }
            if profile.phone.is_some() {
                user.phone.clone_from(&profile.phone);
            }
            user.last_login = Some(now);
            user.updated_at = now;
            return user.clone();
        }

        self.last_user_id += 1;
        let user = User {
            id: UserId::new(self.last_user_id),
            external_customer_id: None,
            email: email.clone(),
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            phone: profile.phone.clone(),
            created_at: now,
            last_login: Some(now),
            updated_at: now,
        };
        self.users.push(user.clone());
        user
    }

    fn upsert_order(&mut self, input: &OrderUpsert) -> Order {
        let now = Utc::now();
        let existing = self
            .orders
            .iter_mut()
            .find(|o| o.external_order_id == input.external_order_id);

        if let Some(order) = existing {
            order.order_number.clone_from(&input.order_number);
            order.customer_id = input.customer_id.or(order.customer_id);
            order.customer_email.clone_from(&input.customer_email);
            order.status = input.status.clone();
            order.total = input.total;
            order.currency.clone_from(&input.currency);
            order.date_created = input.date_created.or(order.date_created);
            order.shipping_address = input.shipping_address.clone();
            order.billing_address = input.billing_address.clone();
            order.payment_method.clone_from(&input.payment_method);
            order.customer_note.clone_from(&input.customer_note);
            if input.tracking.tracking_number.is_some() {
                order.tracking = input.tracking.clone();
            }
            order.is_historical = order.is_historical || input.is_historical;
            order.updated_at = now;
            return order.clone();
        }

        self.last_order_id += 1;
        let order = Order {
            id: OrderId::new(self.last_order_id),
            external_order_id: input.external_order_id,
            order_number: input.order_number.clone(),
            customer_id: input.customer_id,
            customer_email: input.customer_email.clone(),
            status: input.status.clone(),
            total: input.total,
            currency: input.currency.clone(),
            date_created: input.date_created,
            shipping_address: input.shipping_address.clone(),
            billing_address: input.billing_address.clone(),
            payment_method: input.payment_method.clone(),
            customer_note: input.customer_note.clone(),
            tracking: input.tracking.clone(),
            is_historical: input.is_historical,
            created_at: now,
            updated_at: now,
        };
        self.orders.push(order.clone());
        order
    }

    fn replace_items(
        &mut self,
        order_id: OrderId,
        items: &[NewOrderItem],
    ) -> Result<Vec<OrderItem>, RepositoryError> {
        if !self.orders.iter().any(|o| o.id == order_id) {
            return Err(RepositoryError::NotFound);
        }

        self.items.retain(|item| item.order_id != order_id);

        let mut written = Vec::with_capacity(items.len());
        for item in items {
            self.last_item_id += 1;
            written.push(OrderItem {
                id: OrderItemId::new(self.last_item_id),
                order_id,
                external_product_id: item.external_product_id,
                product_name: item.product_name.clone(),
                sku: item.sku.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                total_price: item.total_price,
                product_image: item.product_image.clone(),
            });
        }
        self.items.extend(written.iter().cloned());
        Ok(written)
    }

    fn with_items<'a>(&self, orders: impl Iterator<Item = &'a Order>) -> Vec<OrderWithItems> {
        let mut matched: Vec<OrderWithItems> = orders
            .map(|order| OrderWithItems {
                order: order.clone(),
                items: self
                    .items
                    .iter()
                    .filter(|item| item.order_id == order.id)
                    .cloned()
                    .collect(),
            })
            .collect();

        matched.sort_by(|a, b| {
            b.order
                .date_created
                .cmp(&a.order.date_created)
                .then_with(|| b.order.id.cmp(&a.order.id))
        });
        matched
    }
}

impl OrderStore for MemoryStore {
    async fn upsert_user(&self, user: &UserUpsert) -> Result<User, RepositoryError> {
        self.record_write()?;
        self.lock().upsert_user(user)
    }

    async fn record_login(&self, email: &Email, profile: &LoginProfile) -> Result<User, RepositoryError> {
        self.record_write()?;
        Ok(self.lock().record_login(email, profile))
    }

    async fn upsert_order(&self, order: &OrderUpsert) -> Result<Order, RepositoryError> {
        self.record_write()?;
        Ok(self.lock().upsert_order(order))
    }

    async fn replace_order_items(
        &self,
        order_id: OrderId,
        items: &[NewOrderItem],
    ) -> Result<Vec<OrderItem>, RepositoryError> {
        self.record_write()?;
        self.check_item_write()?;
        self.lock().replace_items(order_id, items)
    }

    async fn save_historical_batch(
        &self,
        orders: &[NormalizedOrder],
    ) -> Result<Vec<SavedOrder>, RepositoryError> {
        self.record_write()?;

        let mut guard = self.lock();
        let mut draft = guard.clone();
        let mut saved = Vec::with_capacity(orders.len());

        for normalized in orders {
            let mut upsert = normalized.order.clone();
            if let Some(customer) = &normalized.customer {
                // A rejected user write leaves the draft untouched
                match draft.upsert_user(customer) {
                    Ok(user) => upsert.customer_id = Some(user.id),
                    Err(e) => warn!(
                        external_order_id = %upsert.external_order_id,
                        error = %e,
                        "Failed to upsert historical order customer, saving without user link"
                    ),
                }
            }
            let order = draft.upsert_order(&upsert);

            let items = match &normalized.items {
                None => ItemsSync::Untouched,
                Some(items) => match self
                    .check_item_write()
                    .and_then(|()| draft.replace_items(order.id, items))
                {
                    Ok(written) => ItemsSync::Replaced(written.len()),
                    Err(_) => ItemsSync::Failed,
                },
            };

            saved.push(SavedOrder { order, items });
        }

        *guard = draft;
        Ok(saved)
    }

    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        self.record_read();
        Ok(self.lock().users.iter().find(|u| &u.email == email).cloned())
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<OrderWithItems>, RepositoryError> {
        self.record_read();
        let state = self.lock();
        Ok(state.with_items(state.orders.iter().filter(|o| o.customer_id == Some(user_id))))
    }

    async fn orders_for_email(&self, email: &Email) -> Result<Vec<OrderWithItems>, RepositoryError> {
        self.record_read();
        let state = self.lock();
        Ok(state.with_items(
            state
                .orders
                .iter()
                .filter(|o| o.customer_email == email.as_str()),
        ))
    }

    async fn has_historical_orders(&self, email: &Email) -> Result<bool, RepositoryError> {
        self.record_read();
        Ok(self
            .lock()
            .orders
            .iter()
            .any(|o| o.is_historical && o.customer_email == email.as_str()))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
