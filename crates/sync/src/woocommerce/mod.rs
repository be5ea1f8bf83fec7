//! WooCommerce REST API access.
//!
//! # Architecture
//!
//! - WooCommerce is the source of truth; the local store mirrors it
//! - Pushes arrive as signed webhooks (see [`crate::services::webhook`])
//! - Pulls go through [`CommercePlatform`], implemented over HTTP by
//!   [`WooCommerceClient`] and by in-memory fakes in tests
//!
//! # Example
//!
//! ```rust,ignore
//! use simply_orders_sync::woocommerce::{CommercePlatform, OrderQuery, WooCommerceClient};
//!
//! let client = WooCommerceClient::new(&config.woocommerce)?;
//! let page = client.fetch_orders_page(&query, 1).await?;
//! ```

mod client;
pub mod types;

use std::future::Future;

use chrono::{DateTime, Utc};
use thiserror::Error;

pub use client::WooCommerceClient;
pub use types::{OrderPage, WcCustomer, WcOrder};

/// Errors that can occur when talking to the WooCommerce REST API.
#[derive(Debug, Error)]
pub enum WooCommerceError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configured site URL cannot be joined with the API path.
    #[error("invalid API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Credentials were rejected.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Rate limited by the platform.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Any other non-success response.
    #[error("HTTP {status}: {body}")]
    Status {
        /// Response status code.
        status: u16,
        /// First part of the response body.
        body: String,
    },
}

/// Filter for the order list endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderQuery {
    /// Free-text search term; the platform matches it against billing details.
    pub search: String,
    /// Only orders created strictly before this instant.
    pub before: DateTime<Utc>,
    /// Orders per page.
    pub per_page: u32,
}

/// Read access to the commerce platform's orders.
pub trait CommercePlatform: Send + Sync + 'static {
    /// Fetch one page (1-based) of orders matching `query`, newest first.
    fn fetch_orders_page(
        &self,
        query: &OrderQuery,
        page: u32,
    ) -> impl Future<Output = Result<OrderPage, WooCommerceError>> + Send;
}
