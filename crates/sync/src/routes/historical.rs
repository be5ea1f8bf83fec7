//! Historical order backfill endpoint.

use axum::{Json, extract::State};
use serde::Deserialize;

use crate::db::OrderStore;
use crate::error::Result;
use crate::services::backfill::parse_cutover;
use crate::services::{BackfillRateLimiter, BackfillRequest, BackfillResult};
use crate::state::AppState;
use crate::woocommerce::CommercePlatform;

/// Request body for `POST /api/historical-orders`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoricalOrdersBody {
    pub email: String,
    /// Cutover; orders on or after it are left to webhooks.
    pub webhook_start_date: Option<String>,
}

/// Load a customer's historical orders (once).
pub async fn fetch<S, C, L>(
    State(state): State<AppState<S, C, L>>,
    Json(body): Json<HistoricalOrdersBody>,
) -> Result<Json<BackfillResult>>
where
    S: OrderStore,
    C: CommercePlatform,
    L: BackfillRateLimiter,
{
    let cutover = body
        .webhook_start_date
        .as_deref()
        .filter(|raw| !raw.trim().is_empty())
        .map(parse_cutover)
        .transpose()?;

    let result = state
        .backfill()
        .backfill(BackfillRequest {
            email: body.email,
            cutover,
        })
        .await?;

    Ok(Json(result))
}
