//! Signup and login recording endpoint.

use axum::{Json, extract::State};
use serde::Deserialize;

use crate::db::OrderStore;
use crate::error::Result;
use crate::models::{LoginProfile, User};
use crate::services::BackfillRateLimiter;
use crate::state::AppState;
use crate::woocommerce::CommercePlatform;

/// Request body for `POST /api/users/login`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginBody {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

/// Record an authenticated signup or login and return the user.
pub async fn login<S, C, L>(
    State(state): State<AppState<S, C, L>>,
    Json(body): Json<LoginBody>,
) -> Result<Json<User>>
where
    S: OrderStore,
    C: CommercePlatform,
    L: BackfillRateLimiter,
{
    let profile = LoginProfile {
        first_name: body.first_name,
        last_name: body.last_name,
        phone: body.phone,
    };

    let user = state.accounts().record_login(&body.email, profile).await?;
    Ok(Json(user))
}
