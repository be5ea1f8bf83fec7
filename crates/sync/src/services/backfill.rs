//! On-demand import of one customer's order history.
//!
//! Orders placed before webhooks were wired up never reached the store. The
//! first time a customer asks, their orders before the cutover are fetched
//! from WooCommerce and saved with `is_historical` set. Once any historical
//! order exists for the email, later requests are answered from the store.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use simply_orders_core::{Email, EmailError, OrderStatus};

use crate::db::{OrderStore, RepositoryError};
use crate::services::normalize::{self, SyncOrigin};
use crate::services::rate_limit::{BackfillRateLimiter, RateDecision};
use crate::woocommerce::{CommercePlatform, OrderQuery, WcOrder, WooCommerceError};

/// Errors from a backfill request.
#[derive(Debug, Error)]
pub enum BackfillError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("invalid cutover date: {0}")]
    InvalidCutover(String),

    #[error("too many backfill requests, retry in {}s", retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    #[error("WooCommerce request failed: {0}")]
    Upstream(#[from] WooCommerceError),

    #[error("store error: {0}")]
    Repository(#[from] RepositoryError),
}

/// A backfill request as received from a client.
#[derive(Debug, Clone)]
pub struct BackfillRequest {
    pub email: String,
    /// Orders at or after this instant are left to webhooks.
    pub cutover: Option<DateTime<Utc>>,
}

/// Summary of one imported order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackfilledOrder {
    pub order_number: String,
    pub date_created: Option<DateTime<Utc>>,
    pub total: Decimal,
    pub status: OrderStatus,
}

/// Result of a backfill request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackfillResult {
    pub success: bool,
    pub message: String,
    /// True when history was already loaded and nothing was fetched.
    pub cached: bool,
    pub count: usize,
    pub orders: Vec<BackfilledOrder>,
}

impl BackfillResult {
    fn cached() -> Self {
        Self {
            success: true,
            message: "Historical orders already loaded".to_owned(),
            cached: true,
            count: 0,
            orders: Vec::new(),
        }
    }

    fn imported(orders: Vec<BackfilledOrder>) -> Self {
        let message = if orders.is_empty() {
            "No historical orders found".to_owned()
        } else {
            format!("Successfully loaded {} historical orders", orders.len())
        };

        Self {
            success: true,
            message,
            cached: false,
            count: orders.len(),
            orders,
        }
    }
}

/// Parse a client-supplied cutover date.
///
/// Accepts RFC 3339, a naive timestamp (read as UTC), or a bare date
/// (midnight UTC).
///
/// # Errors
///
/// Returns `BackfillError::InvalidCutover` if no format matches.
pub fn parse_cutover(raw: &str) -> Result<DateTime<Utc>, BackfillError> {
    let raw = raw.trim();
    normalize::parse_timestamp(raw)
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        })
        .ok_or_else(|| BackfillError::InvalidCutover(raw.to_owned()))
}

/// Runs historical backfills against a platform and a store.
pub struct BackfillService<S, C, L> {
    store: Arc<S>,
    platform: Arc<C>,
    limiter: Arc<L>,
    default_cutover: DateTime<Utc>,
    page_size: u32,
}

impl<S, C, L> BackfillService<S, C, L>
where
    S: OrderStore,
    C: CommercePlatform,
    L: BackfillRateLimiter,
{
    #[must_use]
    pub const fn new(
        store: Arc<S>,
        platform: Arc<C>,
        limiter: Arc<L>,
        default_cutover: DateTime<Utc>,
        page_size: u32,
    ) -> Self {
        Self {
            store,
            platform,
            limiter,
            default_cutover,
            page_size,
        }
    }

    /// Import the customer's orders placed before the cutover, once.
    ///
    /// # Errors
    ///
    /// Checks run in order and each failure stops the request:
    /// `InvalidEmail` (nothing touched), `RateLimited` (no store or platform
    /// access), then `Upstream` or `Repository` from the import itself. A
    /// failed import writes nothing, so retrying is safe.
    #[instrument(skip(self, request), fields(email = tracing::field::Empty))]
    pub async fn backfill(&self, request: BackfillRequest) -> Result<BackfillResult, BackfillError> {
        let email = Email::parse(&request.email)?;
        tracing::Span::current().record("email", email.as_str());

        if let RateDecision::Limited { retry_after } =
            self.limiter.check_and_record(email.as_str()).await
        {
            warn!(retry_after_secs = retry_after.as_secs(), "Backfill rate limited");
            return Err(BackfillError::RateLimited { retry_after });
        }

        if self.store.has_historical_orders(&email).await? {
            debug!("Historical orders already loaded");
            return Ok(BackfillResult::cached());
        }

        let cutover = request.cutover.unwrap_or(self.default_cutover);
        let fetched = self.fetch_all(&email, cutover).await?;

        let mut normalized = Vec::with_capacity(fetched.len());
        for order in &fetched {
            if !placed_by(order, &email) {
                continue;
            }
            match normalize::normalize_order(order, SyncOrigin::Backfill) {
                Ok(n) if n.order.date_created.is_some_and(|d| d < cutover) => normalized.push(n),
                Ok(n) => {
                    debug!(
                        external_order_id = %n.order.external_order_id,
                        "Skipping order not before cutover"
                    );
                }
                Err(e) => warn!(order_id = order.id, error = %e, "Skipping unusable order"),
            }
        }

        let saved = if normalized.is_empty() {
            Vec::new()
        } else {
            self.store.save_historical_batch(&normalized).await?
        };

        let orders: Vec<BackfilledOrder> = saved
            .into_iter()
            .map(|s| BackfilledOrder {
                order_number: s.order.order_number,
                date_created: s.order.date_created,
                total: s.order.total,
                status: s.order.status,
            })
            .collect();

        info!(
            fetched = fetched.len(),
            imported = orders.len(),
            %cutover,
            "Historical backfill complete"
        );

        Ok(BackfillResult::imported(orders))
    }

    async fn fetch_all(
        &self,
        email: &Email,
        cutover: DateTime<Utc>,
    ) -> Result<Vec<WcOrder>, WooCommerceError> {
        let query = OrderQuery {
            search: email.as_str().to_owned(),
            before: cutover,
            per_page: self.page_size,
        };

        let mut orders = Vec::new();
        let mut page = 1;
        loop {
            let batch = self.platform.fetch_orders_page(&query, page).await?;
            debug!(page, total_pages = batch.total_pages, count = batch.orders.len(), "Fetched order page");

            // A page of only undecodable orders is not the end of the results
            let done = (batch.orders.is_empty() && batch.skipped == 0) || page >= batch.total_pages;
            orders.extend(batch.orders);
            if done {
                break;
            }
            page += 1;
        }

        Ok(orders)
    }
}

/// `search` is a fuzzy match, so only keep exact billing-email matches.
fn placed_by(order: &WcOrder, email: &Email) -> bool {
    order.billing.email.trim().eq_ignore_ascii_case(email.as_str())
}
