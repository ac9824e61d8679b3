// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fixed-point money helpers.
//!
//! All amounts are `Decimal` with exactly two fractional digits. Provider
//! amounts travel as integer minor units (cents).

use std::str::FromStr;

use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};

use super::LedgerError;

/// Fractional digits of every stored amount.
pub const SCALE: u32 = 2;

/// Validate a mutation amount and bring it to scale 2.
///
/// Rejects zero, negative amounts, and amounts with more than two
/// significant fractional digits (`1.50` and `1.5` are fine, `1.505` is not).
pub fn validate_amount(amount: Decimal) -> Result<Decimal, LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(
            "Amount must be greater than zero".to_string(),
        ));
    }
    let mut normalized = amount.normalize();
    if normalized.scale() > SCALE {
        return Err(LedgerError::InvalidAmount(
            "Amount must have at most 2 decimal places".to_string(),
        ));
    }
    normalized.rescale(SCALE);
    Ok(normalized)
}

/// Round to scale 2 (half away from zero).
pub fn quantize(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(SCALE);
    rounded
}

/// Parse a decimal string exactly (no float round trip).
pub fn parse_amount(input: &str) -> Result<Decimal, LedgerError> {
    Decimal::from_str(input.trim())
        .map_err(|_| LedgerError::InvalidAmount("Amount must be a valid number".to_string()))
}

/// Major units to minor units, truncating anything below one cent.
///
/// `None` when the result does not fit an `i64`.
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    amount.checked_mul(Decimal::ONE_HUNDRED)?.trunc().to_i64()
}

/// Minor units to a scale-2 major amount.
pub fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, SCALE)
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn validate_rescales_to_two_digits() {
        assert_eq!(validate_amount(dec!(5)).unwrap().to_string(), "5.00");
        assert_eq!(validate_amount(dec!(1.5)).unwrap().to_string(), "1.50");
        assert_eq!(validate_amount(dec!(2.500)).unwrap().to_string(), "2.50");
    }

    #[test]
    fn validate_rejects_non_positive_and_sub_cent() {
        assert!(matches!(
            validate_amount(dec!(0)),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(matches!(
            validate_amount(dec!(-1.00)),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(matches!(
            validate_amount(dec!(1.005)),
            Err(LedgerError::InvalidAmount(_))
        ));
    }

    #[test]
    fn quantize_rounds_half_away_from_zero() {
        assert_eq!(quantize(dec!(4.995)).to_string(), "5.00");
        assert_eq!(quantize(dec!(4.994)).to_string(), "4.99");
        assert_eq!(quantize(dec!(3)).to_string(), "3.00");
    }

    #[test]
    fn minor_units_conversion() {
        assert_eq!(to_minor_units(dec!(15.00)), Some(1500));
        assert_eq!(to_minor_units(dec!(10.999)), Some(1099));
        assert_eq!(from_minor_units(1500), dec!(15.00));
        assert_eq!(from_minor_units(1500).to_string(), "15.00");
    }

    #[test]
    fn minor_units_of_huge_amounts_is_none() {
        assert_eq!(to_minor_units(Decimal::MAX), None);
        let huge = parse_amount("79228162514264337593543950335").unwrap();
        assert_eq!(to_minor_units(huge), None);
        assert_eq!(to_minor_units(dec!(100000000000000000)), None);
    }

    #[test]
    fn parse_is_exact() {
        assert_eq!(parse_amount(" 10.10 ").unwrap(), dec!(10.10));
        assert!(parse_amount("ten").is_err());
    }
}
