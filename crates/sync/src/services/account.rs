//! Signup and login bookkeeping for app users.
//!
//! Authentication happens upstream; this only keeps the local user row and
//! its `last_login` current so that lookups find the user before any
//! WooCommerce customer event arrives.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument};

use simply_orders_core::{Email, EmailError};

use crate::db::{OrderStore, RepositoryError};
use crate::models::{LoginProfile, User};

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("store error: {0}")]
    Repository(#[from] RepositoryError),
}

pub struct AccountService<S> {
    store: Arc<S>,
}

impl<S: OrderStore> AccountService<S> {
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Record an authenticated signup or login.
    ///
    /// Blank profile fields are treated as absent.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::InvalidEmail` before any store access, or the
    /// store error of a failed write.
    #[instrument(skip(self, profile))]
    pub async fn record_login(&self, email: &str, profile: LoginProfile) -> Result<User, AccountError> {
        let email = Email::parse(email)?;
        let profile = LoginProfile {
            first_name: non_blank(profile.first_name),
            last_name: non_blank(profile.last_name),
            phone: non_blank(profile.phone),
        };

        let user = self.store.record_login(&email, &profile).await?;
        info!(user_id = %user.id, "Recorded user login");
        Ok(user)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    #[tokio::test]
    async fn test_invalid_email_touches_nothing() {
        let store = Arc::new(MemoryStore::new());
        let service = AccountService::new(Arc::clone(&store));

        let result = service.record_login("sam", LoginProfile::default()).await;

        assert!(matches!(result, Err(AccountError::InvalidEmail(_))));
        assert_eq!(store.stats().writes, 0);
    }

    #[tokio::test]
    async fn test_signup_then_login() {
        let store = Arc::new(MemoryStore::new());
        let service = AccountService::new(Arc::clone(&store));

        let signup = service
            .record_login(
                " Sam@Example.com ",
                LoginProfile {
                    first_name: Some("Sam".to_owned()),
                    last_name: Some("  ".to_owned()),
                    phone: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(signup.email.as_str(), "sam@example.com");
        assert_eq!(signup.last_name, None);

        let login = service
            .record_login("sam@example.com", LoginProfile::default())
            .await
            .unwrap();

        assert_eq!(login.id, signup.id);
        assert_eq!(login.first_name.as_deref(), Some("Sam"));
        assert!(login.last_login.is_some());
        assert_eq!(store.users().len(), 1);
    }
}
