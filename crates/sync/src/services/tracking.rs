//! Shipment tracking extraction.
//!
//! Fulfilment tools record tracking details in different places: a line in
//! the customer note, `meta_data` entries written by shipment-tracking
//! plugins, or an order note. Each place has an extractor; extractors run in
//! priority order and the first one to produce a field wins that field.
//!
//! Extraction never fails. Missing data yields an empty [`Tracking`].

use std::sync::LazyLock;

use regex::Regex;

use crate::models::Tracking;
use crate::woocommerce::WcOrder;
use crate::woocommerce::types::WcMetaData;

/// `Carrier provider: <carrier>, Tracking ID: <number>` (case-insensitive).
static NOTE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)carrier provider:\s*([^,]+),\s*tracking ID:\s*([^\s,]+)").expect("Invalid regex")
});

const TRACKING_NUMBER_KEYS: &[&str] = &[
    "_tracking_number",
    "tracking_number",
    "_shipment_tracking_number",
];

const CARRIER_KEYS: &[&str] = &[
    "_tracking_provider",
    "tracking_provider",
    "_shipment_tracking_provider",
];

/// Tracking page templates keyed by normalized carrier name.
const CARRIER_URLS: &[(&str, &str)] = &[
    ("australiapost", "https://auspost.com.au/mypost/track/#/details/"),
    ("auspost", "https://auspost.com.au/mypost/track/#/details/"),
    ("startrack", "https://startrack.com.au/track-trace?id="),
    (
        "fastway",
        "https://www.fastway.com.au/courier-services/track-your-parcel?l=",
    ),
    (
        "tnt",
        "https://www.tnt.com/express/en_au/site/shipping-tools/tracking.html?searchType=con&cons=",
    ),
    (
        "dhl",
        "https://www.dhl.com/au-en/home/tracking/tracking-express.html?submit=1&tracking-id=",
    ),
    (
        "fedex",
        "https://www.fedex.com/apps/fedextrack/?action=track&trackingnumber=",
    ),
    ("ups", "https://www.ups.com/track?loc=en_AU&tracknum="),
    (
        "courier",
        "https://www.courierpost.com.au/tools/track-trace?trackNumber=",
    ),
    ("toll", "https://www.tollgroup.com/track-trace?trackingNumber="),
];

/// Fields one extractor managed to find.
#[derive(Debug, Default, PartialEq, Eq)]
struct Partial {
    tracking_number: Option<String>,
    carrier: Option<String>,
}

type Extractor = fn(&WcOrder) -> Partial;

/// Highest priority first.
const EXTRACTORS: &[Extractor] = &[from_customer_note, from_meta_data, from_order_notes];

/// Resolve tracking details for an order.
#[must_use]
pub fn extract(order: &WcOrder) -> Tracking {
    let mut tracking_number = None;
    let mut carrier = None;

    for extractor in EXTRACTORS {
        if tracking_number.is_some() && carrier.is_some() {
            break;
        }
        let found = extractor(order);
        tracking_number = tracking_number.or(found.tracking_number);
        carrier = carrier.or(found.carrier);
    }

    let tracking_url = match (&tracking_number, &carrier) {
        (Some(number), Some(carrier)) => Some(tracking_url(carrier, number)),
        _ => None,
    };

    Tracking {
        tracking_number,
        carrier,
        tracking_url,
    }
}

/// Build the public tracking page URL for a carrier and tracking number.
///
/// Carriers are matched case- and whitespace-insensitively, so
/// `"Australia Post"` and `"australiapost"` are the same carrier. Unknown
/// carriers get a web search URL.
#[must_use]
pub fn tracking_url(carrier: &str, tracking_number: &str) -> String {
    let key = normalize_carrier(carrier);
    let number = urlencoding::encode(tracking_number.trim());

    CARRIER_URLS
        .iter()
        .find(|(name, _)| *name == key)
        .map_or_else(
            || {
                format!(
                    "https://www.google.com/search?q=track+{}+{number}",
                    urlencoding::encode(carrier.trim())
                )
            },
            |(_, base)| format!("{base}{number}"),
        )
}

fn normalize_carrier(carrier: &str) -> String {
    carrier
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn parse_note(text: &str) -> Partial {
    NOTE_PATTERN
        .captures(text)
        .map(|caps| Partial {
            carrier: caps
                .get(1)
                .map(|m| m.as_str().trim().to_string())
                .filter(|s| !s.is_empty()),
            tracking_number: caps.get(2).map(|m| m.as_str().to_string()),
        })
        .unwrap_or_default()
}

fn from_customer_note(order: &WcOrder) -> Partial {
    order
        .customer_note
        .as_deref()
        .map(parse_note)
        .unwrap_or_default()
}

fn from_meta_data(order: &WcOrder) -> Partial {
    let first_value = |keys: &[&str]| {
        order
            .meta_data
            .iter()
            .filter(|meta| keys.contains(&meta.key.as_str()))
            .find_map(WcMetaData::text_value)
    };

    Partial {
        tracking_number: first_value(TRACKING_NUMBER_KEYS),
        carrier: first_value(CARRIER_KEYS),
    }
}

fn from_order_notes(order: &WcOrder) -> Partial {
    order
        .order_notes
        .iter()
        .map(|note| parse_note(&note.note))
        .find(|found| found.tracking_number.is_some())
        .unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn order(json: serde_json::Value) -> WcOrder {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_customer_note() {
        let tracking = extract(&order(serde_json::json!({
            "id": 1,
            "customer_note": "Carrier provider: Australia Post, Tracking ID: AP123456"
        })));

        assert_eq!(tracking.carrier.as_deref(), Some("Australia Post"));
        assert_eq!(tracking.tracking_number.as_deref(), Some("AP123456"));
        assert_eq!(
            tracking.tracking_url.as_deref(),
            Some("https://auspost.com.au/mypost/track/#/details/AP123456")
        );
    }

    #[test]
    fn test_customer_note_is_case_insensitive() {
        let partial = parse_note("CARRIER PROVIDER: dhl,TRACKING id: 99887766, thanks");
        assert_eq!(partial.carrier.as_deref(), Some("dhl"));
        assert_eq!(partial.tracking_number.as_deref(), Some("99887766"));
    }

    #[test]
    fn test_note_beats_meta_data() {
        let tracking = extract(&order(serde_json::json!({
            "id": 1,
            "customer_note": "Carrier provider: StarTrack, Tracking ID: ST1",
            "meta_data": [
                {"key": "_tracking_number", "value": "META1"},
                {"key": "_tracking_provider", "value": "toll"}
            ]
        })));

        assert_eq!(tracking.tracking_number.as_deref(), Some("ST1"));
        assert_eq!(tracking.carrier.as_deref(), Some("StarTrack"));
        assert_eq!(
            tracking.tracking_url.as_deref(),
            Some("https://startrack.com.au/track-trace?id=ST1")
        );
    }

    #[test]
    fn test_meta_data_aliases_and_empty_values() {
        let tracking = extract(&order(serde_json::json!({
            "id": 1,
            "meta_data": [
                {"key": "_tracking_number", "value": ""},
                {"key": "_shipment_tracking_number", "value": "SHIP42"},
                {"key": "tracking_provider", "value": "Fastway"}
            ]
        })));

        assert_eq!(tracking.tracking_number.as_deref(), Some("SHIP42"));
        assert_eq!(tracking.carrier.as_deref(), Some("Fastway"));
        assert_eq!(
            tracking.tracking_url.as_deref(),
            Some("https://www.fastway.com.au/courier-services/track-your-parcel?l=SHIP42")
        );
    }

    #[test]
    fn test_order_notes_fallback() {
        let tracking = extract(&order(serde_json::json!({
            "id": 1,
            "order_notes": [
                {"note": "Order status changed to processing"},
                {"note": "Carrier provider: UPS, Tracking ID: 1Z999"}
            ]
        })));

        assert_eq!(tracking.tracking_number.as_deref(), Some("1Z999"));
        assert_eq!(
            tracking.tracking_url.as_deref(),
            Some("https://www.ups.com/track?loc=en_AU&tracknum=1Z999")
        );
    }

    #[test]
    fn test_number_without_carrier_has_no_url() {
        let tracking = extract(&order(serde_json::json!({
            "id": 1,
            "meta_data": [{"key": "tracking_number", "value": "LONELY1"}]
        })));

        assert_eq!(tracking.tracking_number.as_deref(), Some("LONELY1"));
        assert_eq!(tracking.carrier, None);
        assert_eq!(tracking.tracking_url, None);
    }

    #[test]
    fn test_nothing_found() {
        let tracking = extract(&order(serde_json::json!({"id": 1, "customer_note": "Leave at door"})));
        assert!(tracking.is_empty());
        assert_eq!(tracking.tracking_url, None);
    }

    #[test]
    fn test_unknown_carrier_uses_search() {
        assert_eq!(
            tracking_url("RegionalCourierX", "RC998"),
            "https://www.google.com/search?q=track+RegionalCourierX+RC998"
        );
        assert_eq!(
            tracking_url("Couriers Please", "CP 1"),
            "https://www.google.com/search?q=track+Couriers%20Please+CP%201"
        );
    }

    #[test]
    fn test_carrier_matching_ignores_case_and_spaces() {
        assert_eq!(
            tracking_url(" AusPost ", "X1"),
            "https://auspost.com.au/mypost/track/#/details/X1"
        );
        assert_eq!(
            tracking_url("T N T", "55"),
            "https://www.tnt.com/express/en_au/site/shipping-tools/tracking.html?searchType=con&cons=55"
        );
    }
}
