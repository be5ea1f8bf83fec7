//! HTTP route handlers for the sync service.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                   - Health check
//! GET  /health/ready             - Readiness (store reachable)
//!
//! # Webhooks (WooCommerce -> service)
//! POST    /api/webhooks/woocommerce - Signed order/customer delivery
//! GET     /api/webhooks/woocommerce - Status document
//! OPTIONS /api/webhooks/woocommerce - CORS preflight
//!
//! # Client API (rate limited per IP)
//! POST /api/historical-orders    - One-time historical backfill
//! GET  /api/orders?email=        - User and orders for an email
//! POST /api/users/login          - Record a signup or login
//! ```

pub mod account;
pub mod health;
pub mod historical;
pub mod orders;
pub mod webhooks;

use axum::{
    Json, Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;

use crate::db::OrderStore;
use crate::middleware::client_rate_limiter;
use crate::services::BackfillRateLimiter;
use crate::state::AppState;
use crate::woocommerce::CommercePlatform;

async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Method not allowed" })),
    )
}

/// Create the webhook routes router.
pub fn webhook_routes<S, C, L>() -> Router<AppState<S, C, L>>
where
    S: OrderStore,
    C: CommercePlatform,
    L: BackfillRateLimiter,
{
    Router::new().route(
        "/api/webhooks/woocommerce",
        post(webhooks::receive::<S, C, L>)
            .get(webhooks::status)
            .options(webhooks::preflight)
            .fallback(method_not_allowed),
    )
}

/// Create the client API routes router.
pub fn client_routes<S, C, L>() -> Router<AppState<S, C, L>>
where
    S: OrderStore,
    C: CommercePlatform,
    L: BackfillRateLimiter,
{
    Router::new()
        .route(
            "/api/historical-orders",
            post(historical::fetch::<S, C, L>)
                .options(webhooks::preflight)
                .fallback(method_not_allowed),
        )
        .route("/api/orders", get(orders::list::<S, C, L>))
        .route(
            "/api/users/login",
            post(account::login::<S, C, L>)
                .options(webhooks::preflight)
                .fallback(method_not_allowed),
        )
        .layer(client_rate_limiter())
}

/// Create all routes for the sync service.
pub fn routes<S, C, L>() -> Router<AppState<S, C, L>>
where
    S: OrderStore,
    C: CommercePlatform,
    L: BackfillRateLimiter,
{
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness::<S, C, L>))
        .merge(webhook_routes())
        .merge(client_routes())
}
