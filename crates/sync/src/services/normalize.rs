//! Platform order normalization.
//!
//! Converts WooCommerce resources into the flat records the store keeps.
//! Shape problems in individual fields (an unparseable price, a bad date)
//! are recovered locally with a default and a warning; only a resource that
//! cannot identify itself is rejected.

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::warn;

use simply_orders_core::{
    Email, EmailError, ExternalCustomerId, ExternalOrderId, ExternalProductId, OrderStatus,
    parse_amount,
};

use crate::models::{Address, NewOrderItem, NormalizedOrder, OrderUpsert, UserUpsert};
use crate::services::tracking;
use crate::woocommerce::types::{RawAmount, WcAddress, WcCustomer, WcLineItem, WcOrder};

/// Where an order came from. Backfilled orders are marked historical.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOrigin {
    Webhook,
    Backfill,
}

/// A resource that cannot be normalized at all.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("order id must be positive (got {0})")]
    InvalidOrderId(i64),
    #[error("customer id must be positive (got {0})")]
    InvalidCustomerId(i64),
    #[error("invalid customer email: {0}")]
    InvalidEmail(#[from] EmailError),
}

/// Normalize a platform order.
///
/// # Errors
///
/// Returns `NormalizeError::InvalidOrderId` if the order has no usable id.
pub fn normalize_order(
    order: &WcOrder,
    origin: SyncOrigin,
) -> Result<NormalizedOrder, NormalizeError> {
    if order.id <= 0 {
        return Err(NormalizeError::InvalidOrderId(order.id));
    }

    let billing = &order.billing;
    let customer_email = billing.email.trim().to_lowercase();

    let customer = ExternalCustomerId::from_platform(order.customer_id).and_then(|id| {
        Email::parse(&billing.email)
            .map_err(|e| {
                warn!(order_id = order.id, error = %e, "Registered customer has no usable billing email");
            })
            .ok()
            .map(|email| UserUpsert {
                external_customer_id: Some(id),
                email,
                first_name: non_empty(&billing.first_name),
                last_name: non_empty(&billing.last_name),
                phone: non_empty(&billing.phone),
            })
    });

    let upsert = OrderUpsert {
        external_order_id: ExternalOrderId::new(order.id),
        order_number: if order.number.trim().is_empty() {
            order.id.to_string()
        } else {
            order.number.trim().to_string()
        },
        customer_id: None,
        customer_email,
        status: OrderStatus::from(order.status.trim()),
        total: amount_or_zero(order.total.as_ref(), order.id, "total"),
        currency: order.currency.trim().to_uppercase(),
        date_created: created_at(order),
        shipping_address: shipping_with_fallback(&order.shipping, billing),
        billing_address: address(billing),
        payment_method: order.payment_method_title.as_deref().and_then(non_empty),
        customer_note: order.customer_note.as_deref().and_then(non_empty),
        tracking: tracking::extract(order),
        is_historical: origin == SyncOrigin::Backfill,
    };

    let items = order
        .line_items
        .as_ref()
        .map(|items| items.iter().map(|item| line_item(item, order.id)).collect());

    Ok(NormalizedOrder {
        customer,
        order: upsert,
        items,
    })
}

/// Normalize a platform customer into a user upsert.
///
/// # Errors
///
/// Returns an error if the customer id is not positive or the email is invalid.
pub fn normalize_customer(customer: &WcCustomer) -> Result<UserUpsert, NormalizeError> {
    let external_customer_id = ExternalCustomerId::from_platform(customer.id)
        .ok_or(NormalizeError::InvalidCustomerId(customer.id))?;

    let email = if customer.email.trim().is_empty() {
        Email::parse(&customer.billing.email)?
    } else {
        Email::parse(&customer.email)?
    };

    Ok(UserUpsert {
        external_customer_id: Some(external_customer_id),
        email,
        first_name: non_empty(&customer.first_name).or_else(|| non_empty(&customer.billing.first_name)),
        last_name: non_empty(&customer.last_name).or_else(|| non_empty(&customer.billing.last_name)),
        phone: non_empty(&customer.billing.phone),
    })
}

fn line_item(item: &WcLineItem, order_id: i64) -> NewOrderItem {
    let quantity = i32::try_from(item.quantity).unwrap_or_else(|_| {
        warn!(order_id, quantity = item.quantity, "Line item quantity out of range, defaulting to zero");
        0
    });

    NewOrderItem {
        external_product_id: ExternalProductId::new(item.product_id),
        product_name: item.name.trim().to_string(),
        sku: item.sku.as_deref().and_then(non_empty),
        quantity,
        unit_price: amount_or_zero(item.price.as_ref(), order_id, "line item price"),
        total_price: amount_or_zero(item.total.as_ref(), order_id, "line item total"),
        product_image: item
            .image
            .as_ref()
            .and_then(|image| image.src.as_deref())
            .and_then(non_empty),
    }
}

fn amount_or_zero(raw: Option<&RawAmount>, order_id: i64, field: &'static str) -> Decimal {
    let Some(raw) = raw else {
        return Decimal::ZERO;
    };
    let text = raw.as_text();
    parse_amount(&text).unwrap_or_else(|e| {
        warn!(order_id, field, raw = %text, error = %e, "Unparseable amount, defaulting to zero");
        Decimal::ZERO
    })
}

/// Prefer the GMT timestamp; the local one is read as UTC.
fn created_at(order: &WcOrder) -> Option<DateTime<Utc>> {
    let candidates = [order.date_created_gmt.as_deref(), order.date_created.as_deref()];
    let mut saw_value = false;

    for raw in candidates.into_iter().flatten().map(str::trim) {
        if raw.is_empty() {
            continue;
        }
        saw_value = true;
        if let Some(parsed) = parse_timestamp(raw) {
            return Some(parsed);
        }
    }

    if saw_value {
        warn!(order_id = order.id, "Unparseable order creation date, storing none");
    }
    None
}

/// Parse an RFC 3339 timestamp, or a naive `YYYY-MM-DDTHH:MM:SS` as UTC.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

fn address(source: &WcAddress) -> Address {
    Address {
        first_name: source.first_name.trim().to_string(),
        last_name: source.last_name.trim().to_string(),
        address_1: source.address_1.trim().to_string(),
        address_2: source.address_2.trim().to_string(),
        city: source.city.trim().to_string(),
        state: source.state.trim().to_string(),
        postcode: source.postcode.trim().to_string(),
        country: source.country.trim().to_string(),
    }
}

/// Each empty shipping field falls back to the billing field.
fn shipping_with_fallback(shipping: &WcAddress, billing: &WcAddress) -> Address {
    let pick = |ship: &str, bill: &str| {
        let ship = ship.trim();
        let chosen = if ship.is_empty() { bill.trim() } else { ship };
        chosen.to_string()
    };

    Address {
        first_name: pick(&shipping.first_name, &billing.first_name),
        last_name: pick(&shipping.last_name, &billing.last_name),
        address_1: pick(&shipping.address_1, &billing.address_1),
        address_2: pick(&shipping.address_2, &billing.address_2),
        city: pick(&shipping.city, &billing.city),
        state: pick(&shipping.state, &billing.state),
        postcode: pick(&shipping.postcode, &billing.postcode),
        country: pick(&shipping.country, &billing.country),
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wc_order(value: serde_json::Value) -> WcOrder {
        serde_json::from_value(value).unwrap()
    }

    fn full_order() -> WcOrder {
        wc_order(json!({
            "id": 727,
            "number": "1042",
            "status": "processing",
            "currency": "aud",
            "total": "259.00",
            "date_created": "2024-03-05T10:15:00",
            "date_created_gmt": "2024-03-04T23:15:00",
            "customer_id": 12,
            "customer_note": "Carrier provider: Australia Post, Tracking ID: AP1",
            "payment_method_title": "Credit Card",
            "billing": {
                "first_name": "Jane", "last_name": "Citizen",
                "address_1": "1 Billing St", "address_2": "",
                "city": "Sydney", "state": "NSW", "postcode": "2000", "country": "AU",
                "email": "Jane@Example.com", "phone": "0400 000 000"
            },
            "shipping": {
                "first_name": "", "last_name": "",
                "address_1": "9 Depot Rd", "address_2": "",
                "city": "", "state": "", "postcode": "", "country": ""
            },
            "line_items": [{
                "product_id": 55, "name": "Outdoor Camera", "sku": "CAM-1",
                "quantity": 2, "price": 129.5, "total": "259.00",
                "image": {"src": "https://cdn.test/cam.jpg"}
            }]
        }))
    }

    #[test]
    fn test_full_order() {
        let normalized = normalize_order(&full_order(), SyncOrigin::Webhook).unwrap();
        let order = &normalized.order;

        assert_eq!(order.external_order_id, ExternalOrderId::new(727));
        assert_eq!(order.order_number, "1042");
        assert_eq!(order.customer_email, "jane@example.com");
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.total, Decimal::new(25900, 2));
        assert_eq!(order.currency, "AUD");
        assert_eq!(
            order.date_created.unwrap().to_rfc3339(),
            "2024-03-04T23:15:00+00:00"
        );
        assert_eq!(order.payment_method.as_deref(), Some("Credit Card"));
        assert_eq!(order.tracking.tracking_number.as_deref(), Some("AP1"));
        assert!(!order.is_historical);

        let items = normalized.items.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 2);
        assert_eq!(items[0].unit_price, Decimal::new(1295, 1));
        assert_eq!(items[0].total_price, Decimal::new(25900, 2));
        assert_eq!(items[0].sku.as_deref(), Some("CAM-1"));
        assert_eq!(items[0].product_image.as_deref(), Some("https://cdn.test/cam.jpg"));

        let customer = normalized.customer.unwrap();
        assert_eq!(customer.external_customer_id, Some(ExternalCustomerId::new(12)));
        assert_eq!(customer.email.as_str(), "jane@example.com");
        assert_eq!(customer.phone.as_deref(), Some("0400 000 000"));
    }

    #[test]
    fn test_shipping_falls_back_per_field() {
        let normalized = normalize_order(&full_order(), SyncOrigin::Webhook).unwrap();
        let shipping = &normalized.order.shipping_address;

        assert_eq!(shipping.address_1, "9 Depot Rd");
        assert_eq!(shipping.first_name, "Jane");
        assert_eq!(shipping.city, "Sydney");
        assert_eq!(shipping.postcode, "2000");
        assert_eq!(normalized.order.billing_address.address_1, "1 Billing St");
    }

    #[test]
    fn test_backfill_origin_is_historical() {
        let normalized = normalize_order(&full_order(), SyncOrigin::Backfill).unwrap();
        assert!(normalized.order.is_historical);
    }

    #[test]
    fn test_guest_has_no_customer() {
        let order = wc_order(json!({"id": 5, "customer_id": 0, "billing": {"email": "guest@example.com"}}));
        let normalized = normalize_order(&order, SyncOrigin::Webhook).unwrap();
        assert!(normalized.customer.is_none());
        assert_eq!(normalized.order.customer_email, "guest@example.com");
    }

    #[test]
    fn test_absent_and_empty_line_items() {
        let absent = normalize_order(&wc_order(json!({"id": 5})), SyncOrigin::Webhook).unwrap();
        assert_eq!(absent.items, None);

        let empty = normalize_order(&wc_order(json!({"id": 5, "line_items": []})), SyncOrigin::Webhook)
            .unwrap();
        assert_eq!(empty.items, Some(Vec::new()));
    }

    #[test]
    fn test_bad_amounts_and_dates_default() {
        let order = wc_order(json!({
            "id": 5,
            "total": "N/A",
            "date_created": "yesterday",
            "line_items": [{"product_id": 1, "name": "Cable", "quantity": 1, "price": "free"}]
        }));
        let normalized = normalize_order(&order, SyncOrigin::Webhook).unwrap();

        assert_eq!(normalized.order.total, Decimal::ZERO);
        assert_eq!(normalized.order.date_created, None);
        assert_eq!(normalized.items.unwrap()[0].unit_price, Decimal::ZERO);
    }

    #[test]
    fn test_local_date_used_when_gmt_missing() {
        let order = wc_order(json!({"id": 5, "date_created": "2023-11-30T08:00:00"}));
        let normalized = normalize_order(&order, SyncOrigin::Webhook).unwrap();
        assert_eq!(
            normalized.order.date_created.unwrap().to_rfc3339(),
            "2023-11-30T08:00:00+00:00"
        );
    }

    #[test]
    fn test_missing_order_number_uses_id() {
        let normalized = normalize_order(&wc_order(json!({"id": 88})), SyncOrigin::Webhook).unwrap();
        assert_eq!(normalized.order.order_number, "88");
    }

    #[test]
    fn test_invalid_order_id() {
        assert_eq!(
            normalize_order(&wc_order(json!({"id": 0})), SyncOrigin::Webhook),
            Err(NormalizeError::InvalidOrderId(0))
        );
    }

    #[test]
    fn test_customer_email_falls_back_to_billing() {
        let customer: WcCustomer = serde_json::from_value(json!({
            "id": 3,
            "email": "",
            "first_name": "",
            "billing": {"email": "Bill@Example.com", "first_name": "Bill", "phone": "02 9999 0000"}
        }))
        .unwrap();

        let upsert = normalize_customer(&customer).unwrap();
        assert_eq!(upsert.email.as_str(), "bill@example.com");
        assert_eq!(upsert.first_name.as_deref(), Some("Bill"));
        assert_eq!(upsert.phone.as_deref(), Some("02 9999 0000"));
    }

    #[test]
    fn test_customer_requires_positive_id() {
        let customer: WcCustomer =
            serde_json::from_value(json!({"id": 0, "email": "a@b.com"})).unwrap();
        assert_eq!(
            normalize_customer(&customer),
            Err(NormalizeError::InvalidCustomerId(0))
        );
    }
}
