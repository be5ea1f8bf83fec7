//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use simply_orders_core::{Email, ExternalCustomerId, UserId};

/// A customer known to the commerce platform (domain type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    /// Local user ID.
    pub id: UserId,
    /// WooCommerce customer ID, if the user has a platform account.
    pub external_customer_id: Option<ExternalCustomerId>,
    /// Normalized email address (unique).
    pub email: Email,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    /// When the user was first recorded.
    pub created_at: DateTime<Utc>,
    /// Last authenticated login, if any.
    pub last_login: Option<DateTime<Utc>>,
    /// When the user was last synced.
    pub updated_at: DateTime<Utc>,
}

/// Insert-or-update input for a [`User`].
///
/// Keyed on `external_customer_id` when present, otherwise on `email`.
/// `None` name and phone fields never overwrite values already stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserUpsert {
    pub external_customer_id: Option<ExternalCustomerId>,
    pub email: Email,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

/// Profile fields supplied when a user signs up or logs in.
///
/// Login usually carries none of them; signup carries the names entered in
/// the form. `None` fields never overwrite stored values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginProfile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}
