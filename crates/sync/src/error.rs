//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//! Responses are JSON: `{"error": ...}` plus `message` or `retryAfter` where
//! the client can act on them.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;

use crate::services::{AccountError, BackfillError, LookupError, WebhookError};

/// Application-level error type for the sync service.
#[derive(Debug, Error)]
pub enum AppError {
    /// Webhook delivery could not be verified or applied.
    #[error("Webhook error: {0}")]
    Webhook(#[from] WebhookError),

    /// Historical backfill failed.
    #[error("Backfill error: {0}")]
    Backfill(#[from] BackfillError),

    /// Order lookup failed.
    #[error("Lookup error: {0}")]
    Lookup(#[from] LookupError),

    /// Signup or login could not be recorded.
    #[error("Account error: {0}")]
    Account(#[from] AccountError),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Webhook(err) => match err {
                WebhookError::MissingSignature | WebhookError::InvalidSignature => {
                    StatusCode::UNAUTHORIZED
                }
                WebhookError::Malformed(_) | WebhookError::Invalid(_) => StatusCode::BAD_REQUEST,
                WebhookError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Backfill(err) => match err {
                BackfillError::InvalidEmail(_) | BackfillError::InvalidCutover(_) => {
                    StatusCode::BAD_REQUEST
                }
                BackfillError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
                BackfillError::Upstream(_) => StatusCode::BAD_GATEWAY,
                BackfillError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Lookup(err) => match err {
                LookupError::InvalidEmail(_) => StatusCode::BAD_REQUEST,
                LookupError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Account(err) => match err {
                AccountError::InvalidEmail(_) => StatusCode::BAD_REQUEST,
                AccountError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    // Don't expose internal error details to clients
    fn body(&self) -> Value {
        match self {
            Self::Webhook(err) => match err {
                WebhookError::MissingSignature | WebhookError::InvalidSignature => {
                    json!({ "error": "Invalid signature" })
                }
                WebhookError::Malformed(e) => {
                    json!({ "error": "Invalid payload", "message": e.to_string() })
                }
                WebhookError::Invalid(e) => {
                    json!({ "error": "Invalid payload", "message": e.to_string() })
                }
                WebhookError::Repository(_) => json!({
                    "error": "Internal server error",
                    "message": "Failed to process webhook",
                }),
            },
            Self::Backfill(err) => match err {
                BackfillError::InvalidEmail(_) => json!({ "error": "Valid email is required" }),
                BackfillError::InvalidCutover(_) => {
                    json!({ "error": "webhookStartDate must be a valid date" })
                }
                BackfillError::RateLimited { retry_after } => json!({
                    "error": "Rate limit exceeded. Please try again later.",
                    "retryAfter": retry_after.as_secs(),
                }),
                BackfillError::Upstream(_) => json!({
                    "error": "Failed to fetch historical orders",
                    "message": "External service error",
                }),
                BackfillError::Repository(_) => json!({
                    "error": "Failed to save historical orders",
                    "message": "Internal server error",
                }),
            },
            Self::Lookup(err) => match err {
                LookupError::InvalidEmail(_) => json!({ "error": "Valid email is required" }),
                LookupError::Repository(_) => json!({ "error": "Internal server error" }),
            },
            Self::Account(err) => match err {
                AccountError::InvalidEmail(_) => json!({ "error": "Valid email is required" }),
                AccountError::Repository(_) => json!({ "error": "Internal server error" }),
            },
            Self::BadRequest(msg) => json!({ "error": msg }),
            Self::Internal(_) => json!({ "error": "Internal server error" }),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let mut response = (status, Json(self.body())).into_response();

        if let Self::Backfill(BackfillError::RateLimited { retry_after }) = &self {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from(retry_after.as_secs()),
            );
        }

        response
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for a processing step.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of steps
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("webhook", "Received delivery", Some(&[("topic", "order.created")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::db::RepositoryError;

    #[test]
    fn test_app_error_display() {
        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");

        let err = AppError::Webhook(WebhookError::InvalidSignature);
        assert_eq!(err.to_string(), "Webhook error: invalid webhook signature");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: impl Into<AppError>) -> StatusCode {
            let response = err.into().into_response();
            response.status()
        }

        assert_eq!(
            get_status(WebhookError::MissingSignature),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(WebhookError::Repository(RepositoryError::NotFound)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(BackfillError::RateLimited {
                retry_after: Duration::from_secs(60)
            }),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            get_status(BackfillError::InvalidCutover("soon".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(BackfillError::Upstream(
                crate::woocommerce::WooCommerceError::RateLimited(30)
            )),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(AccountError::Repository(RepositoryError::NotFound)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_rate_limited_sets_retry_after() {
        let response = AppError::from(BackfillError::RateLimited {
            retry_after: Duration::from_secs(120),
        })
        .into_response();

        assert_eq!(
            response.headers().get(header::RETRY_AFTER),
            Some(&HeaderValue::from_static("120"))
        );
    }

    #[test]
    fn test_internal_details_hidden() {
        let err = AppError::from(WebhookError::Repository(RepositoryError::Conflict(
            "order: duplicate key value violates unique constraint".to_string(),
        )));
        assert_eq!(
            err.body(),
            json!({ "error": "Internal server error", "message": "Failed to process webhook" })
        );
    }
}
