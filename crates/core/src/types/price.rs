//! Decimal amount parsing for platform-supplied money values.
//!
//! WooCommerce reports totals as strings (`"259.00"`) and line item unit
//! prices as JSON numbers (`129.5`). Both are parsed into [`Decimal`] so no
//! value ever passes through binary floating point.

use std::str::FromStr;

use rust_decimal::Decimal;

/// Errors that can occur when parsing a money amount.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    /// The input was empty or only whitespace.
    #[error("amount cannot be empty")]
    Empty,
    /// The input is not a decimal number.
    #[error("invalid amount {0:?}")]
    Invalid(String),
}

/// Parse a decimal amount such as `"259.00"`, `"129.5"` or `"1e2"`.
///
/// # Errors
///
/// Returns [`AmountError::Empty`] for blank input and
/// [`AmountError::Invalid`] when the text is not a number.
///
/// # Examples
///
/// ```
/// use rust_decimal::Decimal;
/// use simply_orders_core::parse_amount;
///
/// assert_eq!(parse_amount("259.00").unwrap(), Decimal::new(25900, 2));
/// assert!(parse_amount("abc").is_err());
/// ```
pub fn parse_amount(raw: &str) -> Result<Decimal, AmountError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }

    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| AmountError::Invalid(trimmed.to_owned()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_string_total() {
        let amount = parse_amount("259.00").unwrap();
        assert_eq!(amount, Decimal::new(259, 0));
        assert_eq!(amount.to_string(), "259.00");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert_eq!(parse_amount(" 12.5 ").unwrap(), Decimal::new(125, 1));
    }

    #[test]
    fn test_parse_scientific() {
        assert_eq!(parse_amount("1e2").unwrap(), Decimal::new(100, 0));
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(parse_amount(""), Err(AmountError::Empty));
        assert_eq!(parse_amount("  "), Err(AmountError::Empty));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(matches!(parse_amount("N/A"), Err(AmountError::Invalid(_))));
    }
}
