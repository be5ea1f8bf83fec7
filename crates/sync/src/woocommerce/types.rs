//! WooCommerce REST API wire types.
//!
//! These mirror the JSON shape of `/wp-json/wc/v3/orders` and of webhook
//! payloads, which share the same resource representation. Everything the
//! platform may omit or send as `null` is optional or defaulted so that a
//! sparse payload still deserializes; normalization decides what is usable.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

/// An order resource.
#[derive(Debug, Clone, Deserialize)]
pub struct WcOrder {
    #[serde(deserialize_with = "lenient_i64")]
    pub id: i64,
    #[serde(default, deserialize_with = "string_or_number")]
    pub number: String,
    #[serde(default, deserialize_with = "null_to_default")]
    pub status: String,
    #[serde(default, deserialize_with = "null_to_default")]
    pub currency: String,
    #[serde(default)]
    pub total: Option<RawAmount>,
    #[serde(default)]
    pub date_created: Option<String>,
    #[serde(default)]
    pub date_created_gmt: Option<String>,
    /// `0` for guest checkouts.
    #[serde(default, deserialize_with = "lenient_i64")]
    pub customer_id: i64,
    #[serde(default)]
    pub customer_note: Option<String>,
    #[serde(default, deserialize_with = "null_to_default")]
    pub billing: WcAddress,
    #[serde(default, deserialize_with = "null_to_default")]
    pub shipping: WcAddress,
    #[serde(default)]
    pub payment_method_title: Option<String>,
    /// Absent in some partial webhook payloads; see `NormalizedOrder::items`.
    #[serde(default)]
    pub line_items: Option<Vec<WcLineItem>>,
    #[serde(default, deserialize_with = "null_to_default")]
    pub meta_data: Vec<WcMetaData>,
    /// Present when a notes plugin embeds order notes in the resource.
    #[serde(default, deserialize_with = "null_to_default")]
    pub order_notes: Vec<WcOrderNote>,
}

/// Billing or shipping address. Shipping addresses carry no email or phone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WcAddress {
    #[serde(default, deserialize_with = "null_to_default")]
    pub first_name: String,
    #[serde(default, deserialize_with = "null_to_default")]
    pub last_name: String,
    #[serde(default, deserialize_with = "null_to_default")]
    pub address_1: String,
    #[serde(default, deserialize_with = "null_to_default")]
    pub address_2: String,
    #[serde(default, deserialize_with = "null_to_default")]
    pub city: String,
    #[serde(default, deserialize_with = "null_to_default")]
    pub state: String,
    #[serde(default, deserialize_with = "null_to_default")]
    pub postcode: String,
    #[serde(default, deserialize_with = "null_to_default")]
    pub country: String,
    #[serde(default, deserialize_with = "null_to_default")]
    pub email: String,
    #[serde(default, deserialize_with = "null_to_default")]
    pub phone: String,
}

/// An order line item.
#[derive(Debug, Clone, Deserialize)]
pub struct WcLineItem {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub product_id: i64,
    #[serde(default, deserialize_with = "null_to_default")]
    pub name: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub quantity: i64,
    /// Unit price, sent as a JSON number.
    #[serde(default)]
    pub price: Option<RawAmount>,
    /// Line total, sent as a string.
    #[serde(default)]
    pub total: Option<RawAmount>,
    #[serde(default)]
    pub image: Option<WcImage>,
}

/// Product image attached to a line item.
#[derive(Debug, Clone, Deserialize)]
pub struct WcImage {
    #[serde(default)]
    pub src: Option<String>,
}

/// A `meta_data` entry. Values are arbitrary JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct WcMetaData {
    pub key: String,
    #[serde(default)]
    pub value: Value,
}

impl WcMetaData {
    /// Returns the value as trimmed text if it is a non-empty string or a number.
    #[must_use]
    pub fn text_value(&self) -> Option<String> {
        match &self.value {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// A structured order note.
#[derive(Debug, Clone, Deserialize)]
pub struct WcOrderNote {
    #[serde(default, deserialize_with = "null_to_default")]
    pub note: String,
}

/// A customer resource, as delivered by `customer.*` webhooks.
#[derive(Debug, Clone, Deserialize)]
pub struct WcCustomer {
    #[serde(deserialize_with = "lenient_i64")]
    pub id: i64,
    #[serde(default, deserialize_with = "null_to_default")]
    pub email: String,
    #[serde(default, deserialize_with = "null_to_default")]
    pub first_name: String,
    #[serde(default, deserialize_with = "null_to_default")]
    pub last_name: String,
    #[serde(default, deserialize_with = "null_to_default")]
    pub billing: WcAddress,
}

/// A money amount as the platform sends it: a decimal string or a JSON number.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    Number(serde_json::Number),
    Text(String),
}

impl RawAmount {
    /// Returns the amount in its textual form for decimal parsing.
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

/// One page of orders from the list endpoint.
#[derive(Debug, Clone, Default)]
pub struct OrderPage {
    pub orders: Vec<WcOrder>,
    /// Orders on the page that could not be decoded.
    pub skipped: usize,
    /// From the `X-WP-TotalPages` header.
    pub total_pages: u32,
}

/// Decode an order list body one order at a time.
///
/// An order that does not decode is logged and counted in the second
/// element instead of failing the whole page.
///
/// # Errors
///
/// Returns an error only if the body is not a JSON array.
pub fn decode_orders(body: &str) -> Result<(Vec<WcOrder>, usize), serde_json::Error> {
    let raw: Vec<Value> = serde_json::from_str(body)?;
    let mut orders = Vec::with_capacity(raw.len());
    let mut skipped = 0;

    for value in raw {
        let order_id = value.get("id").cloned().unwrap_or(Value::Null);
        match serde_json::from_value::<WcOrder>(value) {
            Ok(order) => orders.push(order),
            Err(e) => {
                skipped += 1;
                warn!(%order_id, error = %e, "Skipping undecodable WooCommerce order");
            }
        }
    }

    Ok((orders, skipped))
}

/// Deserialize `null` as `T::default()`.
fn null_to_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Integers sent as numbers, numeric strings or `null` (as zero).
///
/// Some plugins rewrite ids and quantities as strings.
fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<Value>::deserialize(deserializer)? {
        None => Ok(0),
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| D::Error::custom(format!("expected an integer, got {n}"))),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(0),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| D::Error::custom(format!("expected an integer, got {s:?}"))),
        Some(other) => Err(D::Error::custom(format!("expected an integer, got {other}"))),
    }
}

/// Order numbers are strings but some plugins send them as numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_order_deserializes() {
        let order: WcOrder = serde_json::from_str(r#"{"id": 7, "billing": null}"#).unwrap();
        assert_eq!(order.id, 7);
        assert!(order.line_items.is_none());
        assert!(order.billing.email.is_empty());
        assert!(order.meta_data.is_empty());
    }

    #[test]
    fn test_order_requires_id() {
        assert!(serde_json::from_str::<WcOrder>(r#"{"number": "1"}"#).is_err());
    }

    #[test]
    fn test_numeric_order_number() {
        let order: WcOrder = serde_json::from_str(r#"{"id": 7, "number": 1042}"#).unwrap();
        assert_eq!(order.number, "1042");
    }

    #[test]
    fn test_string_integers_are_accepted() {
        let order: WcOrder = serde_json::from_str(
            r#"{"id": "42", "customer_id": "7", "line_items": [{"product_id": "5", "quantity": "2"}]}"#,
        )
        .unwrap();
        assert_eq!(order.id, 42);
        assert_eq!(order.customer_id, 7);
        let item = &order.line_items.unwrap()[0];
        assert_eq!(item.product_id, 5);
        assert_eq!(item.quantity, 2);
    }

    #[test]
    fn test_null_customer_id_is_guest() {
        let order: WcOrder = serde_json::from_str(r#"{"id": 1, "customer_id": null}"#).unwrap();
        assert_eq!(order.customer_id, 0);
    }

    #[test]
    fn test_decode_orders_skips_bad_order() {
        let body = r#"[
            {"id": 1, "billing": {"email": "a@example.com"}},
            {"id": 2, "line_items": [{"product_id": 5, "quantity": "two"}]},
            {"id": 3, "line_items": [{"product_id": 5, "quantity": "2"}]}
        ]"#;

        let (orders, skipped) = decode_orders(body).unwrap();

        let ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(skipped, 1);
    }

    #[test]
    fn test_decode_orders_rejects_non_array() {
        assert!(decode_orders(r#"{"code": "woocommerce_rest_cannot_view"}"#).is_err());
    }

    #[test]
    fn test_raw_amount_accepts_number_and_string() {
        let item: WcLineItem =
            serde_json::from_str(r#"{"product_id": 1, "price": 129.5, "total": "259.00"}"#)
                .unwrap();
        assert_eq!(item.price.unwrap().as_text(), "129.5");
        assert_eq!(item.total.unwrap().as_text(), "259.00");
    }

    #[test]
    fn test_meta_text_value() {
        let meta: WcMetaData =
            serde_json::from_str(r#"{"key": "_tracking_number", "value": " AB12 "}"#).unwrap();
        assert_eq!(meta.text_value().as_deref(), Some("AB12"));

        let empty: WcMetaData =
            serde_json::from_str(r#"{"key": "_tracking_number", "value": ""}"#).unwrap();
        assert_eq!(empty.text_value(), None);

        let object: WcMetaData =
            serde_json::from_str(r#"{"key": "_wc_shipment", "value": {"a": 1}}"#).unwrap();
        assert_eq!(object.text_value(), None);
    }
}
