//! Money calculation utilities using rust_decimal for precision
//!
//! Every monetary figure in the engine is a `Decimal`. Rounding is half-up
//! (`MidpointAwayFromZero`) at 2 decimal places and is applied once per output field.

use rust_decimal::prelude::*;

use crate::core::SettlementError;

/// Decimal places for monetary values
pub const DECIMAL_PLACES: u32 = 2;

/// Decimal places kept for a wallet's real ratio
pub const RATIO_DECIMAL_PLACES: u32 = 8;

/// Tolerance for monetary comparisons (0.01)
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// One cent, the smallest allocatable unit
pub const CENT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Maximum allowed single amount (10,000,000)
const MAX_AMOUNT: Decimal = Decimal::from_parts(10_000_000, 0, 0, false, 0);

/// Round a monetary value to 2 decimal places, half-up
#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Truncate a non-negative monetary value to whole cents
#[inline]
pub fn floor_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::ToNegativeInfinity)
}

/// Clamp a ratio into [0, 1] and normalise its precision
#[inline]
pub fn clamp_ratio(ratio: Decimal) -> Decimal {
    ratio
        .max(Decimal::ZERO)
        .min(Decimal::ONE)
        .round_dp_with_strategy(RATIO_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert f64 to Decimal for calculation
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64 for display/export, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    round_money(value).to_f64().unwrap_or_default()
}

/// Compare two monetary values within [`MONEY_TOLERANCE`]
#[inline]
pub fn money_eq(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() < MONEY_TOLERANCE
}

/// Validate that an f64 coming from an external payload is finite
pub fn require_finite(value: f64, field_name: &str) -> Result<Decimal, SettlementError> {
    if !value.is_finite() {
        return Err(SettlementError::Validation(format!(
            "{} must be a finite number, got {}",
            field_name, value
        )));
    }
    Ok(to_decimal(value))
}

/// Validate an amount is within [0, MAX_AMOUNT]
pub fn require_non_negative(value: Decimal, field_name: &str) -> Result<(), SettlementError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(SettlementError::Validation(format!(
            "{} must be non-negative, got {}",
            field_name, value
        )));
    }
    if value > MAX_AMOUNT {
        return Err(SettlementError::Validation(format!(
            "{} exceeds maximum allowed ({}), got {}",
            field_name, MAX_AMOUNT, value
        )));
    }
    Ok(())
}

/// Validate an amount is within (0, MAX_AMOUNT]
pub fn require_positive(value: Decimal, field_name: &str) -> Result<(), SettlementError> {
    require_non_negative(value, field_name)?;
    if value.is_zero() {
        return Err(SettlementError::Validation(format!(
            "{} must be positive, got {}",
            field_name, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_money(d("0.005")), d("0.01"));
        assert_eq!(round_money(d("0.004")), d("0.00"));
        assert_eq!(round_money(d("2.675")), d("2.68"));
        assert_eq!(round_money(d("10.125")), d("10.13"));
    }

    #[test]
    fn test_floor_money() {
        assert_eq!(floor_money(d("3.339")), d("3.33"));
        assert_eq!(floor_money(d("3.33")), d("3.33"));
    }

    #[test]
    fn test_clamp_ratio() {
        assert_eq!(clamp_ratio(d("1.0000001")), Decimal::ONE);
        assert_eq!(clamp_ratio(d("-0.2")), Decimal::ZERO);
        assert_eq!(clamp_ratio(d("0.666666666666")), d("0.66666667"));
    }

    #[test]
    fn test_to_f64_rounds() {
        assert_eq!(to_f64(d("10.005")), 10.01);
        assert_eq!(to_decimal(f64::NAN), Decimal::ZERO);
    }

    #[test]
    fn test_money_eq() {
        assert!(money_eq(d("10.00"), d("10.009")));
        assert!(!money_eq(d("10.00"), d("10.01")));
    }

    #[test]
    fn test_require_finite() {
        assert!(require_finite(f64::INFINITY, "amount").is_err());
        assert_eq!(require_finite(12.5, "amount").unwrap(), d("12.5"));
    }

    #[test]
    fn test_require_bounds() {
        assert!(require_non_negative(Decimal::ZERO, "amount").is_ok());
        assert!(require_non_negative(d("-0.01"), "amount").is_err());
        assert!(require_non_negative(d("10000000.01"), "amount").is_err());
        assert!(require_positive(Decimal::ZERO, "amount").is_err());
        assert!(require_positive(d("0.01"), "amount").is_ok());
    }
}
