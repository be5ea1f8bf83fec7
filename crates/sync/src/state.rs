//! Application state shared across handlers.

use std::sync::Arc;

use secrecy::SecretString;
use sqlx::PgPool;

use crate::config::{BackfillConfig, SyncConfig};
use crate::db::{OrderStore, PgOrderStore};
use crate::services::{
    AccountService, BackfillRateLimiter, BackfillService, LookupService, SlidingWindowLimiter,
    WebhookService,
};
use crate::woocommerce::{CommercePlatform, WooCommerceClient, WooCommerceError};

/// Application state shared across all handlers.
///
/// Generic over the store, the commerce platform and the backfill rate
/// limiter so tests can run the full router in memory. Production uses the
/// defaults. Cheaply cloneable via `Arc`.
pub struct AppState<S = PgOrderStore, C = WooCommerceClient, L = SlidingWindowLimiter> {
    inner: Arc<AppStateInner<S, C, L>>,
}

// Manual impl: `derive` would require `S: Clone` etc.
impl<S, C, L> Clone for AppState<S, C, L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct AppStateInner<S, C, L> {
    store: Arc<S>,
    webhooks: WebhookService<S>,
    backfill: BackfillService<S, C, L>,
    lookup: LookupService<S>,
    accounts: AccountService<S>,
}

impl<S, C, L> AppState<S, C, L>
where
    S: OrderStore,
    C: CommercePlatform,
    L: BackfillRateLimiter,
{
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `store` - Order store shared by all services
    /// * `platform` - Commerce platform used for backfills
    /// * `limiter` - Per-email backfill rate limiter
    /// * `webhook_secret` - Shared webhook signing secret
    /// * `backfill` - Backfill cutover and page size
    #[must_use]
    pub fn new(
        store: S,
        platform: C,
        limiter: L,
        webhook_secret: SecretString,
        backfill: &BackfillConfig,
    ) -> Self {
        let store = Arc::new(store);

        Self {
            inner: Arc::new(AppStateInner {
                webhooks: WebhookService::new(Arc::clone(&store), webhook_secret),
                backfill: BackfillService::new(
                    Arc::clone(&store),
                    Arc::new(platform),
                    Arc::new(limiter),
                    backfill.default_cutover,
                    backfill.page_size,
                ),
                lookup: LookupService::new(Arc::clone(&store)),
                accounts: AccountService::new(Arc::clone(&store)),
                store,
            }),
        }
    }

    /// Get a reference to the order store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// Get a reference to the webhook service.
    #[must_use]
    pub fn webhooks(&self) -> &WebhookService<S> {
        &self.inner.webhooks
    }

    /// Get a reference to the backfill service.
    #[must_use]
    pub fn backfill(&self) -> &BackfillService<S, C, L> {
        &self.inner.backfill
    }

    /// Get a reference to the lookup service.
    #[must_use]
    pub fn lookup(&self) -> &LookupService<S> {
        &self.inner.lookup
    }

    /// Get a reference to the account service.
    #[must_use]
    pub fn accounts(&self) -> &AccountService<S> {
        &self.inner.accounts
    }
}

impl AppState {
    /// Create the production state: `PostgreSQL`, WooCommerce and an
    /// in-process rate limiter.
    ///
    /// # Errors
    ///
    /// Returns an error if the WooCommerce client cannot be built.
    pub fn from_config(config: &SyncConfig, pool: PgPool) -> Result<Self, WooCommerceError> {
        let platform = WooCommerceClient::new(&config.woocommerce)?;
        let limiter = SlidingWindowLimiter::new(
            config.backfill.rate_limit_max,
            config.backfill.rate_limit_window,
        );

        Ok(Self::new(
            PgOrderStore::new(pool),
            platform,
            limiter,
            config.woocommerce.webhook_secret.clone(),
            &config.backfill,
        ))
    }
}
