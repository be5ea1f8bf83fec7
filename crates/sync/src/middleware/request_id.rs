//! Request ID middleware for correlating logs, Sentry events and responses.
//!
//! WooCommerce retries failed deliveries, so the same webhook often shows up
//! several times in the logs. Each attempt gets its own request ID; the
//! delivery ID header is recorded alongside it when present.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// WooCommerce's per-delivery identifier.
pub const DELIVERY_ID_HEADER: &str = "x-wc-webhook-delivery-id";

/// Middleware that ensures every request has a unique request ID.
///
/// An upstream `x-request-id` is reused; otherwise a UUID v4 is generated.
/// The ID is recorded in the current span, tagged on the Sentry scope and
/// echoed in the response headers.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .filter(|s| !s.is_empty())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    let delivery_id = request
        .headers()
        .get(DELIVERY_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(String::from);

    let span = Span::current();
    span.record("request_id", &request_id);
    if let Some(delivery_id) = &delivery_id {
        span.record("delivery_id", delivery_id);
    }

    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
        if let Some(delivery_id) = &delivery_id {
            scope.set_tag("delivery_id", delivery_id);
        }
    });

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Router, body::Body, middleware, routing::get};
    use tower::ServiceExt;

    use super::*;

    fn app() -> Router {
        Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(middleware::from_fn(request_id_middleware))
    }

    #[tokio::test]
    async fn test_generates_request_id() {
        let response = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let id = response.headers().get(REQUEST_ID_HEADER).unwrap();
        assert!(Uuid::parse_str(id.to_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_reuses_upstream_request_id() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(REQUEST_ID_HEADER, "edge-1234")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers().get(REQUEST_ID_HEADER).unwrap(), "edge-1234");
    }
}
