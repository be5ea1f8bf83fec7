//! Health check endpoints.

use axum::{extract::State, http::StatusCode};

use crate::db::OrderStore;
use crate::services::BackfillRateLimiter;
use crate::state::AppState;
use crate::woocommerce::CommercePlatform;

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies store connectivity before returning OK.
/// Returns 503 Service Unavailable if the store is not reachable.
pub async fn readiness<S, C, L>(State(state): State<AppState<S, C, L>>) -> StatusCode
where
    S: OrderStore,
    C: CommercePlatform,
    L: BackfillRateLimiter,
{
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
