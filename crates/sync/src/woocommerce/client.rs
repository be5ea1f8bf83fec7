//! WooCommerce REST API client implementation.
//!
//! Authenticates with consumer key/secret over HTTP basic auth (the site must
//! be served over HTTPS) and uses `reqwest` 0.13 for HTTP.

use std::sync::Arc;
use std::time::Duration;

use chrono::SecondsFormat;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument, warn};
use url::Url;

use super::types::{OrderPage, decode_orders};
use super::{CommercePlatform, OrderQuery, WooCommerceError};
use crate::config::WooCommerceConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const TOTAL_PAGES_HEADER: &str = "x-wp-totalpages";

/// Client for the WooCommerce REST API.
#[derive(Clone)]
pub struct WooCommerceClient {
    inner: Arc<WooCommerceClientInner>,
}

struct WooCommerceClientInner {
    client: reqwest::Client,
    orders_endpoint: Url,
    consumer_key: String,
    consumer_secret: SecretString,
}

impl WooCommerceClient {
    /// Create a new WooCommerce API client.
    ///
    /// # Errors
    ///
    /// Returns `WooCommerceError::InvalidUrl` if the endpoint URL cannot be
    /// built, or `WooCommerceError::Http` if the HTTP client fails to build.
    pub fn new(config: &WooCommerceConfig) -> Result<Self, WooCommerceError> {
        let mut base = config.base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let api_version = config.api_version.trim_matches('/');
        let orders_endpoint = base.join(&format!("wp-json/{api_version}/orders"))?;

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(WooCommerceClientInner {
                client,
                orders_endpoint,
                consumer_key: config.consumer_key.clone(),
                consumer_secret: config.consumer_secret.clone(),
            }),
        })
    }

    /// The resolved order list endpoint.
    #[must_use]
    pub fn orders_endpoint(&self) -> &Url {
        &self.inner.orders_endpoint
    }
}

impl CommercePlatform for WooCommerceClient {
    #[instrument(skip(self, query), fields(per_page = query.per_page))]
    async fn fetch_orders_page(
        &self,
        query: &OrderQuery,
        page: u32,
    ) -> Result<OrderPage, WooCommerceError> {
        let before = query.before.to_rfc3339_opts(SecondsFormat::Secs, true);
        let per_page = query.per_page.to_string();
        let page_param = page.to_string();

        let response = self
            .inner
            .client
            .get(self.inner.orders_endpoint.clone())
            .basic_auth(
                &self.inner.consumer_key,
                Some(self.inner.consumer_secret.expose_secret()),
            )
            .query(&[
                ("search", query.search.as_str()),
                ("before", before.as_str()),
                ("per_page", per_page.as_str()),
                ("page", page_param.as_str()),
                ("orderby", "date"),
                ("order", "desc"),
                ("status", "any"),
            ])
            .send()
            .await?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(WooCommerceError::RateLimited(retry_after));
        }

        let total_pages = response
            .headers()
            .get(TOTAL_PAGES_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u32>().ok())
            .unwrap_or(1);

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;
        let snippet = || response_text.chars().take(500).collect::<String>();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            tracing::error!(status = %status, body = %snippet(), "WooCommerce rejected API credentials");
            return Err(WooCommerceError::Unauthorized(snippet()));
        }

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %snippet(),
                "WooCommerce API returned non-success status"
            );
            return Err(WooCommerceError::Status {
                status: status.as_u16(),
                body: response_text.chars().take(200).collect(),
            });
        }

        let (orders, skipped) = decode_orders(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %snippet(),
                "Failed to parse WooCommerce orders response"
            );
            WooCommerceError::Parse(e)
        })?;

        if skipped > 0 {
            warn!(page, skipped, "Skipped undecodable orders on page");
        }
        debug!(count = orders.len(), total_pages, "Fetched orders page");

        Ok(OrderPage {
            orders,
            skipped,
            total_pages,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config(base: &str) -> WooCommerceConfig {
        WooCommerceConfig {
            base_url: Url::parse(base).unwrap(),
            api_version: "wc/v3".to_string(),
            consumer_key: "ck_test".to_string(),
            consumer_secret: SecretString::from("cs_test"),
            webhook_secret: SecretString::from("whsec"),
        }
    }

    #[test]
    fn test_orders_endpoint_from_site_root() {
        let client = WooCommerceClient::new(&config("https://shop.test")).unwrap();
        assert_eq!(
            client.orders_endpoint().as_str(),
            "https://shop.test/wp-json/wc/v3/orders"
        );
    }

    #[test]
    fn test_orders_endpoint_keeps_subdirectory_install() {
        let client = WooCommerceClient::new(&config("https://example.test/store")).unwrap();
        assert_eq!(
            client.orders_endpoint().as_str(),
            "https://example.test/store/wp-json/wc/v3/orders"
        );
    }
}
