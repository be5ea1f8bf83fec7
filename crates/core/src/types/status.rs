//! Order status as reported by WooCommerce.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Order status.
///
/// The platform owns the set of statuses (plugins add their own), so unknown
/// values are carried through verbatim as [`OrderStatus::Other`] rather than
/// rejected. Serializes as the platform's slug.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    OnHold,
    Shipped,
    Completed,
    Cancelled,
    Refunded,
    Failed,
    Draft,
    /// Any status slug not listed above.
    Other(String),
}

impl OrderStatus {
    /// Returns the platform slug for this status.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::OnHold => "on-hold",
            Self::Shipped => "shipped",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
            Self::Failed => "failed",
            Self::Draft => "checkout-draft",
            Self::Other(slug) => slug,
        }
    }
}

impl From<&str> for OrderStatus {
    fn from(slug: &str) -> Self {
        match slug {
            "pending" => Self::Pending,
            "processing" => Self::Processing,
            "on-hold" => Self::OnHold,
            "shipped" => Self::Shipped,
            "completed" => Self::Completed,
            "cancelled" => Self::Cancelled,
            "refunded" => Self::Refunded,
            "failed" => Self::Failed,
            "checkout-draft" => Self::Draft,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl From<String> for OrderStatus {
    fn from(slug: String) -> Self {
        Self::from(slug.as_str())
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        match status {
            OrderStatus::Other(slug) => slug,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_slugs_roundtrip() {
        for slug in ["pending", "processing", "on-hold", "completed", "cancelled"] {
            assert_eq!(OrderStatus::from(slug).as_str(), slug);
        }
    }

    #[test]
    fn test_unknown_slug_is_preserved() {
        let status = OrderStatus::from("awaiting-pickup");
        assert_eq!(status, OrderStatus::Other("awaiting-pickup".to_owned()));
        assert_eq!(status.to_string(), "awaiting-pickup");
    }

    #[test]
    fn test_serde_uses_slug() {
        let json = serde_json::to_string(&OrderStatus::OnHold).ok();
        assert_eq!(json.as_deref(), Some("\"on-hold\""));

        let parsed: Option<OrderStatus> = serde_json::from_str("\"processing\"").ok();
        assert_eq!(parsed, Some(OrderStatus::Processing));
    }
}
