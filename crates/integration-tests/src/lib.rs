//! Integration tests for Simply Online order sync.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory router tests
//! cargo test -p simply-orders-integration-tests
//!
//! # Including the PostgreSQL store tests
//! TEST_DATABASE_URL=postgres://localhost/simply_orders_test \
//!     cargo test -p simply-orders-integration-tests -- --include-ignored
//! ```
//!
//! # Test Categories
//!
//! - `webhooks` - Signed webhook ingestion through the router
//! - `historical_orders` - Backfill endpoint against a recording platform
//! - `orders_lookup` - Lookup endpoint
//! - `accounts` - Signup and login recording
//! - `postgres_store` - `PgOrderStore` against a real database (ignored by default)
//!
//! Router tests run the full middleware stack against a `MemoryStore` and a
//! [`RecordingPlatform`] standing in for WooCommerce.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use secrecy::SecretString;
use serde_json::{Value, json};
use sha2::Sha256;
use tower::ServiceExt;

use simply_orders_sync::config::BackfillConfig;
use simply_orders_sync::db::MemoryStore;
use simply_orders_sync::services::SlidingWindowLimiter;
use simply_orders_sync::state::AppState;
use simply_orders_sync::woocommerce::{
    CommercePlatform, OrderPage, OrderQuery, WcOrder, WooCommerceError,
};

/// Webhook secret shared by the test app and [`sign`].
pub const WEBHOOK_SECRET: &str = "wh_test_7Hq2Zp9Lx4Vn8Rk3";

/// Client IP sent with every request; the per-IP limiter needs one.
const CLIENT_IP: &str = "203.0.113.10";

/// State type used by the test app.
pub type TestState = AppState<MemoryStore, RecordingPlatform, SlidingWindowLimiter>;

/// Compute the WooCommerce signature for a body.
#[must_use]
pub fn sign(body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(WEBHOOK_SECRET.as_bytes()).unwrap();
    mac.update(body);
    STANDARD.encode(mac.finalize().into_bytes())
}

#[derive(Default)]
struct PlatformState {
    pages: Vec<Vec<WcOrder>>,
    calls: Vec<(OrderQuery, u32)>,
}

/// Fake WooCommerce that serves canned pages and records every call.
///
/// Like the real API, it only returns orders strictly before
/// `query.before`.
#[derive(Clone, Default)]
pub struct RecordingPlatform {
    state: Arc<Mutex<PlatformState>>,
}

impl RecordingPlatform {
    /// Serve `pages` (each a list of order JSON objects) in order.
    #[must_use]
    pub fn with_pages(pages: Vec<Vec<Value>>) -> Self {
        let pages = pages
            .into_iter()
            .map(|page| {
                page.into_iter()
                    .map(|order| serde_json::from_value(order).unwrap())
                    .collect()
            })
            .collect();

        Self {
            state: Arc::new(Mutex::new(PlatformState {
                pages,
                calls: Vec::new(),
            })),
        }
    }

    /// Every `(query, page)` requested so far.
    #[must_use]
    pub fn calls(&self) -> Vec<(OrderQuery, u32)> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .calls
            .clone()
    }
}

impl CommercePlatform for RecordingPlatform {
    async fn fetch_orders_page(
        &self,
        query: &OrderQuery,
        page: u32,
    ) -> Result<OrderPage, WooCommerceError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.calls.push((query.clone(), page));

        let orders = usize::try_from(page)
            .ok()
            .and_then(|p| p.checked_sub(1))
            .and_then(|index| state.pages.get(index))
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|order| {
                order
                    .date_created_gmt
                    .as_deref()
                    .and_then(simply_orders_sync::services::normalize::parse_timestamp)
                    .is_some_and(|created| created < query.before)
            })
            .collect();

        Ok(OrderPage {
            orders,
            skipped: 0,
            total_pages: u32::try_from(state.pages.len()).unwrap_or(1).max(1),
        })
    }
}

/// The router plus handles on its store and platform.
pub struct TestApp {
    pub router: Router,
    pub state: TestState,
    pub platform: RecordingPlatform,
}

impl TestApp {
    /// App with an empty store and a platform with no orders.
    #[must_use]
    pub fn new() -> Self {
        Self::with_platform(RecordingPlatform::default())
    }

    /// App backed by `platform` with the default backfill settings.
    #[must_use]
    pub fn with_platform(platform: RecordingPlatform) -> Self {
        let backfill = BackfillConfig::default();
        let state = AppState::new(
            MemoryStore::new(),
            platform.clone(),
            SlidingWindowLimiter::new(backfill.rate_limit_max, Duration::from_secs(15 * 60)),
            SecretString::from(WEBHOOK_SECRET),
            &backfill,
        );

        Self {
            router: simply_orders_sync::app(state.clone()),
            state,
            platform,
        }
    }

    /// The in-memory store behind the app.
    #[must_use]
    pub fn store(&self) -> &MemoryStore {
        self.state.store()
    }

    /// Send a request and return the status and JSON body (`Null` if empty).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    /// Deliver a webhook with an explicit signature header (or none).
    pub async fn webhook_with_signature(
        &self,
        topic: &str,
        body: &[u8],
        signature: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/api/webhooks/woocommerce")
            .header("content-type", "application/json")
            .header("x-wc-webhook-topic", topic)
            .header("x-wc-webhook-source", "https://shop.example.com.au/");
        if let Some(signature) = signature {
            builder = builder.header("x-wc-webhook-signature", signature);
        }
        self.send(builder.body(Body::from(body.to_vec())).unwrap())
            .await
    }

    /// Deliver a correctly signed webhook.
    pub async fn webhook(&self, topic: &str, payload: &Value) -> (StatusCode, Value) {
        let body = serde_json::to_vec(payload).unwrap();
        let signature = sign(&body);
        self.webhook_with_signature(topic, &body, Some(&signature))
            .await
    }

    /// `POST` JSON to a client endpoint.
    pub async fn post_json(&self, uri: &str, payload: &Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .header("x-forwarded-for", CLIENT_IP)
            .body(Body::from(serde_json::to_vec(payload).unwrap()))
            .unwrap();
        self.send(request).await
    }

    /// `GET` a client endpoint.
    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri(uri)
            .header("x-forwarded-for", CLIENT_IP)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Order 1042 from `a@b.com`: one line of 2 x 129.50.
#[must_use]
pub fn order_1042() -> Value {
    json!({
        "id": 5042,
        "number": "1042",
        "status": "processing",
        "currency": "aud",
        "total": "259.00",
        "date_created": "2024-05-02T10:15:00",
        "date_created_gmt": "2024-05-02T00:15:00",
        "customer_id": 0,
        "customer_note": "",
        "payment_method_title": "Credit Card",
        "billing": {
            "first_name": "Alex",
            "last_name": "Brown",
            "address_1": "12 Harbour St",
            "address_2": "",
            "city": "Sydney",
            "state": "NSW",
            "postcode": "2000",
            "country": "AU",
            "email": "a@b.com",
            "phone": "0400 000 000"
        },
        "shipping": {
            "first_name": "",
            "last_name": "",
            "address_1": "",
            "address_2": "",
            "city": "",
            "state": "",
            "postcode": "",
            "country": ""
        },
        "line_items": [
            {
                "product_id": 88,
                "name": "Outdoor 4K Camera",
                "sku": "CAM-4K-OUT",
                "quantity": 2,
                "price": 129.5,
                "total": "259.00",
                "image": { "src": "https://shop.example.com.au/cam.jpg" }
            }
        ],
        "meta_data": []
    })
}

/// A minimal historical order for backfill tests.
#[must_use]
pub fn historical_order(id: i64, email: &str, created_gmt: &str) -> Value {
    json!({
        "id": id,
        "number": id.to_string(),
        "status": "completed",
        "currency": "AUD",
        "total": "49.95",
        "date_created_gmt": created_gmt,
        "customer_id": 0,
        "billing": { "email": email, "first_name": "Alex" },
        "line_items": [
            { "product_id": 7, "name": "Mount", "quantity": 1, "price": "49.95", "total": "49.95" }
        ]
    })
}
