//! WooCommerce webhook endpoint.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::info;

use crate::db::OrderStore;
use crate::error::{Result, add_breadcrumb};
use crate::services::BackfillRateLimiter;
use crate::state::AppState;
use crate::woocommerce::CommercePlatform;

const SIGNATURE_HEADER: &str = "x-wc-webhook-signature";
const TOPIC_HEADER: &str = "x-wc-webhook-topic";
const SOURCE_HEADER: &str = "x-wc-webhook-source";

/// Acknowledgement returned for every verified delivery.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub success: bool,
    pub topic: String,
    pub processed_at: DateTime<Utc>,
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Verify and apply a webhook delivery.
///
/// The body is taken as raw bytes: the signature covers the exact bytes
/// WooCommerce sent.
pub async fn receive<S, C, L>(
    State(state): State<AppState<S, C, L>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>>
where
    S: OrderStore,
    C: CommercePlatform,
    L: BackfillRateLimiter,
{
    let topic = header(&headers, TOPIC_HEADER).unwrap_or_default();
    let source = header(&headers, SOURCE_HEADER).unwrap_or("unknown");

    info!(topic, source, bytes = body.len(), "Webhook received");
    add_breadcrumb("webhook", "Received delivery", Some(&[("topic", topic)]));

    let outcome = state
        .webhooks()
        .handle(topic, header(&headers, SIGNATURE_HEADER), &body)
        .await?;

    Ok(Json(WebhookAck {
        success: true,
        topic: outcome.topic,
        processed_at: Utc::now(),
    }))
}

/// Endpoint status document.
pub async fn status() -> Json<Value> {
    Json(json!({
        "message": "Simply Online webhook handler",
        "timestamp": Utc::now(),
        "features": [
            "Order sync with tracking numbers",
            "Automatic carrier detection",
            "Tracking URL generation",
            "Customer sync",
        ],
    }))
}

/// CORS preflight.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}
