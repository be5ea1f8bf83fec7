//! WooCommerce webhook ingestion.
//!
//! WooCommerce signs each delivery with `base64(HMAC-SHA256(body, secret))`
//! in `X-WC-Webhook-Signature`. Nothing is parsed or written until the
//! signature over the raw body has been verified.
//!
//! Deliveries are retried by the platform on any non-2xx response, so
//! handling must be idempotent: every write is an upsert keyed on a platform
//! id and replaying an event converges to the same rows.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;
use tracing::{debug, info, instrument};

use simply_orders_core::{ExternalOrderId, UserId};

use crate::db::{OrderStore, RepositoryError};
use crate::models::ItemsSync;
use crate::services::normalize::{self, NormalizeError, SyncOrigin};
use crate::woocommerce::{WcCustomer, WcOrder};

type HmacSha256 = Hmac<Sha256>;

/// Errors from webhook handling.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("missing webhook signature")]
    MissingSignature,

    #[error("invalid webhook signature")]
    InvalidSignature,

    /// Verified body is not the expected resource JSON.
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Verified resource cannot be normalized.
    #[error("invalid payload: {0}")]
    Invalid(#[from] NormalizeError),

    #[error("store error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Webhook topics this service acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookTopic {
    OrderCreated,
    OrderUpdated,
    CustomerCreated,
    CustomerUpdated,
    /// Acknowledged without side effects.
    Other(String),
}

impl From<&str> for WebhookTopic {
    fn from(topic: &str) -> Self {
        match topic.trim() {
            "order.created" => Self::OrderCreated,
            "order.updated" => Self::OrderUpdated,
            "customer.created" => Self::CustomerCreated,
            "customer.updated" => Self::CustomerUpdated,
            other => Self::Other(other.to_owned()),
        }
    }
}

/// What a delivery changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEffect {
    OrderSaved {
        external_order_id: ExternalOrderId,
        items: ItemsSync,
    },
    CustomerSaved {
        user_id: UserId,
    },
    Ignored,
}

/// Result of a handled delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookOutcome {
    /// The topic header as received.
    pub topic: String,
    pub effect: WebhookEffect,
}

/// Verifies and applies webhook deliveries.
pub struct WebhookService<S> {
    store: Arc<S>,
    secret: SecretString,
}

impl<S: OrderStore> WebhookService<S> {
    /// Create a webhook service writing to `store`.
    #[must_use]
    pub const fn new(store: Arc<S>, secret: SecretString) -> Self {
        Self { store, secret }
    }

    /// Verify a delivery signature in constant time.
    ///
    /// # Errors
    ///
    /// Returns `MissingSignature` if no signature was sent and
    /// `InvalidSignature` if it is not valid base64 or does not match.
    pub fn verify_signature(&self, body: &[u8], signature: Option<&str>) -> Result<(), WebhookError> {
        let signature = signature
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(WebhookError::MissingSignature)?;

        let expected = STANDARD
            .decode(signature)
            .map_err(|_| WebhookError::InvalidSignature)?;

        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| WebhookError::InvalidSignature)?;
        mac.update(body);

        // `verify_slice` compares in constant time
        mac.verify_slice(&expected)
            .map_err(|_| WebhookError::InvalidSignature)?;

        debug!("Webhook signature verified");
        Ok(())
    }

    /// Verify and apply one delivery.
    ///
    /// # Errors
    ///
    /// Returns a signature error before touching the store, a payload error
    /// if the verified body is unusable, or the store error that aborted the
    /// write.
    #[instrument(skip(self, signature, body), fields(bytes = body.len()))]
    pub async fn handle(
        &self,
        topic: &str,
        signature: Option<&str>,
        body: &[u8],
    ) -> Result<WebhookOutcome, WebhookError> {
        self.verify_signature(body, signature)?;

        let effect = match WebhookTopic::from(topic) {
            WebhookTopic::OrderCreated | WebhookTopic::OrderUpdated => {
                let order: WcOrder = serde_json::from_slice(body)?;
                let normalized = normalize::normalize_order(&order, SyncOrigin::Webhook)?;
                let saved = self.store.save_order(&normalized).await?;

                info!(
                    external_order_id = %saved.order.external_order_id,
                    order_number = %saved.order.order_number,
                    items = ?saved.items,
                    "Synced order from webhook"
                );
                WebhookEffect::OrderSaved {
                    external_order_id: saved.order.external_order_id,
                    items: saved.items,
                }
            }
            WebhookTopic::CustomerCreated | WebhookTopic::CustomerUpdated => {
                let customer: WcCustomer = serde_json::from_slice(body)?;
                let upsert = normalize::normalize_customer(&customer)?;
                let user = self.store.upsert_user(&upsert).await?;

                info!(user_id = %user.id, "Synced customer from webhook");
                WebhookEffect::CustomerSaved { user_id: user.id }
            }
            WebhookTopic::Other(other) => {
                info!(topic = %other, "Ignoring unhandled webhook topic");
                WebhookEffect::Ignored
            }
        };

        Ok(WebhookOutcome {
            topic: topic.to_owned(),
            effect,
        })
    }
}
