//! Order lookup endpoint.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use crate::db::OrderStore;
use crate::error::Result;
use crate::services::{BackfillRateLimiter, CustomerOrders};
use crate::state::AppState;
use crate::woocommerce::CommercePlatform;

#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    #[serde(default)]
    pub email: String,
}

/// `GET /api/orders?email=` - the user for an email and their orders.
pub async fn list<S, C, L>(
    State(state): State<AppState<S, C, L>>,
    Query(query): Query<OrdersQuery>,
) -> Result<Json<CustomerOrders>>
where
    S: OrderStore,
    C: CommercePlatform,
    L: BackfillRateLimiter,
{
    let found = state.lookup().orders_for(&query.email).await?;
    Ok(Json(found))
}
