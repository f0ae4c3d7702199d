//! Bounds of the `Decimal(16, 4)` money columns.

use rust_decimal::Decimal;

use crate::error::{BillingError, Result};

/// Digits allowed before the decimal point.
pub const INTEGER_DIGITS: u32 = 12;
/// Digits allowed after the decimal point.
pub const SCALE: u32 = 4;

fn upper_bound() -> Decimal {
    Decimal::from(10_i64.pow(INTEGER_DIGITS))
}

/// Rejects values a money column cannot hold without rounding.
pub fn ensure_storable(field: &'static str, value: Decimal) -> Result<()> {
    if value.abs() >= upper_bound() || value.normalize().scale() > SCALE {
        return Err(BillingError::AmountOutOfRange { field, value });
    }
    Ok(())
}

/// Rejects negative money values.
pub fn ensure_non_negative(field: &'static str, value: Decimal) -> Result<()> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(BillingError::NegativeAmount { field, value });
    }
    Ok(())
}

/// A price or fixed total as accepted from a caller: non-negative and storable.
pub fn validate_amount(field: &'static str, value: Decimal) -> Result<()> {
    ensure_non_negative(field, value)?;
    ensure_storable(field, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_ensure_non_negative() {
        assert!(ensure_non_negative("price", Decimal::ZERO).is_ok());
        assert!(ensure_non_negative("price", Decimal::new(-0, 2)).is_ok());
        assert!(ensure_non_negative("price", Decimal::new(1, 2)).is_ok());
        assert!(ensure_non_negative("price", Decimal::new(-1, 2)).is_err());
    }

    #[test]
    fn test_largest_storable_value() {
        let largest = Decimal::from_str("999999999999.9999").unwrap();
        assert!(validate_amount("price", largest).is_ok());

        let too_large = Decimal::from_str("1000000000000").unwrap();
        assert!(matches!(
            validate_amount("price", too_large),
            Err(BillingError::AmountOutOfRange { field: "price", .. })
        ));
    }

    #[test]
    fn test_scale_beyond_four_places() {
        assert!(validate_amount("total", Decimal::from_str("1.00001").unwrap()).is_err());
        // Trailing zeros do not count
        assert!(validate_amount("total", Decimal::from_str("1.230000").unwrap()).is_ok());
    }

    #[test]
    fn test_negative_wins_over_range() {
        let result = validate_amount("total", Decimal::from_str("-1e20").unwrap());
        assert!(matches!(result, Err(BillingError::NegativeAmount { .. })));
    }
}
