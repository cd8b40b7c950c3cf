//! Decimal price parsing
//!
//! Venues send prices as decimal strings. The string is validated with
//! `rust_decimal` (plain decimal syntax only: no exponent, no `NaN`, no
//! `inf`) and then converted with a correctly rounded decimal-to-binary
//! parse, so the resulting `f64` is the nearest representable value.

use crate::errors::PriceError;
use rust_decimal::Decimal;

/// Parse a venue price string into a strictly positive `f64`.
pub fn parse_decimal_price(raw: &str) -> Result<f64, PriceError> {
    let trimmed = raw.trim();
    let decimal = Decimal::from_str_exact(trimmed)
        .map_err(|_| PriceError::InvalidDecimal(raw.to_string()))?;

    if decimal <= Decimal::ZERO {
        return Err(PriceError::NonPositive(raw.to_string()));
    }

    let price: f64 = trimmed
        .parse()
        .map_err(|_| PriceError::NotRepresentable(raw.to_string()))?;

    if !price.is_finite() || price <= 0.0 {
        return Err(PriceError::NotRepresentable(raw.to_string()));
    }

    Ok(price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_plain_decimal() {
        assert_eq!(parse_decimal_price("43250.12000000").unwrap(), 43250.12);
        assert_eq!(parse_decimal_price("0.00001234").unwrap(), 0.00001234);
    }

    #[test]
    fn test_zero_is_rejected() {
        assert_eq!(
            parse_decimal_price("0.00000000"),
            Err(PriceError::NonPositive("0.00000000".to_string()))
        );
    }

    #[test]
    fn test_negative_is_rejected() {
        assert!(matches!(
            parse_decimal_price("-1.5"),
            Err(PriceError::NonPositive(_))
        ));
    }

    #[test]
    fn test_non_decimal_syntax_is_rejected() {
        for raw in ["", "abc", "NaN", "inf", "1e5", "1.2.3"] {
            assert!(
                matches!(parse_decimal_price(raw), Err(PriceError::InvalidDecimal(_))),
                "expected {raw:?} to be rejected"
            );
        }
    }

    proptest! {
        #[test]
        fn prop_matches_std_parse(int in 1u64..10_000_000, frac in 0u32..100_000_000) {
            let raw = format!("{int}.{frac:08}");
            let expected: f64 = raw.parse().unwrap();
            prop_assert_eq!(parse_decimal_price(&raw).unwrap(), expected);
        }
    }
}
