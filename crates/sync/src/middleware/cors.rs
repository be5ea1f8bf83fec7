//! CORS for browser clients and webhook preflights.
//!
//! The companion app calls the API from arbitrary origins and carries no
//! credentials, so any origin is allowed.

use axum::http::{HeaderName, Method, header};
use tower_http::cors::{Any, CorsLayer};

/// Headers WooCommerce sends with webhook deliveries.
const WEBHOOK_HEADERS: [&str; 7] = [
    "x-wc-webhook-source",
    "x-wc-webhook-topic",
    "x-wc-webhook-resource",
    "x-wc-webhook-event",
    "x-wc-webhook-signature",
    "x-wc-webhook-id",
    "x-wc-webhook-delivery-id",
];

/// Create the CORS layer: any origin, `GET`/`POST`/`OPTIONS`.
#[must_use]
pub fn cors_layer() -> CorsLayer {
    let mut headers = vec![header::CONTENT_TYPE, header::AUTHORIZATION];
    headers.extend(WEBHOOK_HEADERS.into_iter().map(HeaderName::from_static));

    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(headers)
}
