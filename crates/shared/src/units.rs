//! Conversion between human-readable decimal strings and integer base units.

use alloy_primitives::U256;
use thiserror::Error;

use crate::domain::TOKEN_DECIMALS;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitsError {
    #[error("amount is empty")]
    Empty,
    #[error("negative amounts are not supported")]
    Negative,
    #[error("amount is not a decimal number")]
    InvalidDigit,
    #[error("fractional component exceeds {decimals} decimals")]
    TooManyDecimals { decimals: u8 },
    #[error("amount does not fit in 256 bits")]
    Overflow,
}

fn scale(decimals: u8) -> Result<U256, UnitsError> {
    let ten = U256::from(10u64);
    (0..decimals).try_fold(U256::from(1u64), |acc, _| {
        acc.checked_mul(ten).ok_or(UnitsError::Overflow)
    })
}

fn push_digits(mut acc: U256, digits: &str) -> Result<U256, UnitsError> {
    let ten = U256::from(10u64);
    for b in digits.bytes() {
        let digit = U256::from(u64::from(b - b'0'));
        acc = acc
            .checked_mul(ten)
            .and_then(|v| v.checked_add(digit))
            .ok_or(UnitsError::Overflow)?;
    }
    Ok(acc)
}

/// Parses a decimal string such as `"12.5"` into base units with `decimals` places.
///
/// Trailing zeros in the fraction are ignored before the precision check, so
/// `"1.50"` is accepted for any `decimals >= 1`.
pub fn parse_units(raw: &str, decimals: u8) -> Result<U256, UnitsError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(UnitsError::Empty);
    }
    if value.starts_with('-') {
        return Err(UnitsError::Negative);
    }

    let (whole, fraction) = match value.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (value, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(UnitsError::InvalidDigit);
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(UnitsError::InvalidDigit);
    }

    let fraction = fraction.trim_end_matches('0');
    if fraction.len() > usize::from(decimals) {
        return Err(UnitsError::TooManyDecimals { decimals });
    }

    let whole_units = push_digits(U256::ZERO, whole)?
        .checked_mul(scale(decimals)?)
        .ok_or(UnitsError::Overflow)?;
    let padded = format!("{fraction:0<width$}", width = usize::from(decimals));
    let fraction_units = push_digits(U256::ZERO, &padded)?;

    whole_units
        .checked_add(fraction_units)
        .ok_or(UnitsError::Overflow)
}

/// Renders base units as a decimal string, keeping at least one fractional digit
/// (`1000000000000000000` with 18 decimals renders as `"1.0"`).
pub fn format_units(amount: U256, decimals: u8) -> String {
    if decimals == 0 {
        return amount.to_string();
    }
    // scale() only overflows past 77 decimals, which no token uses.
    let unit = match scale(decimals) {
        Ok(unit) => unit,
        Err(_) => return amount.to_string(),
    };
    let whole = amount / unit;
    let fraction = amount % unit;
    let padded = format!(
        "{:0>width$}",
        fraction.to_string(),
        width = usize::from(decimals)
    );
    let trimmed = padded.trim_end_matches('0');
    let fraction = if trimmed.is_empty() { "0" } else { trimmed };
    format!("{whole}.{fraction}")
}

pub fn parse_ether(raw: &str) -> Result<U256, UnitsError> {
    parse_units(raw, TOKEN_DECIMALS)
}

pub fn format_ether(amount: U256) -> String {
    format_units(amount, TOKEN_DECIMALS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ether(n: u64) -> U256 {
        U256::from(n) * U256::from(1_000_000_000_000_000_000u64)
    }

    #[test]
    fn parses_small_fraction_into_base_units() {
        assert_eq!(
            parse_ether("0.0001").expect("parse"),
            U256::from(100_000_000_000_000u64)
        );
    }

    #[test]
    fn parses_whole_and_leading_dot_amounts() {
        assert_eq!(parse_ether("42").expect("parse"), ether(42));
        assert_eq!(
            parse_ether(".5").expect("parse"),
            U256::from(500_000_000_000_000_000u64)
        );
        assert_eq!(parse_ether(" 3.0 ").expect("parse"), ether(3));
    }

    #[test]
    fn rejects_malformed_amounts() {
        assert_eq!(parse_ether(""), Err(UnitsError::Empty));
        assert_eq!(parse_ether("   "), Err(UnitsError::Empty));
        assert_eq!(parse_ether("-1"), Err(UnitsError::Negative));
        assert_eq!(parse_ether("1.2.3"), Err(UnitsError::InvalidDigit));
        assert_eq!(parse_ether("abc"), Err(UnitsError::InvalidDigit));
        assert_eq!(parse_ether("1e18"), Err(UnitsError::InvalidDigit));
        assert_eq!(parse_ether("."), Err(UnitsError::InvalidDigit));
        assert_eq!(
            parse_ether("0.0000000000000000001"),
            Err(UnitsError::TooManyDecimals { decimals: 18 })
        );
    }

    #[test]
    fn ignores_trailing_fraction_zeros_past_precision() {
        assert_eq!(parse_units("1.500", 1).expect("parse"), U256::from(15u64));
    }

    #[test]
    fn detects_overflow() {
        let huge = "9".repeat(80);
        assert_eq!(parse_ether(&huge), Err(UnitsError::Overflow));
    }

    #[test]
    fn formats_total_supply_as_decimal_string() {
        assert_eq!(format_ether(ether(1_000_000)), "1000000.0");
        assert_eq!(format_ether(U256::ZERO), "0.0");
        assert_eq!(
            format_ether(U256::from(100_000_000_000_000u64)),
            "0.0001"
        );
        assert_eq!(
            format_ether(ether(12) + U256::from(345_000_000_000_000_000u64)),
            "12.345"
        );
        assert_eq!(format_ether(U256::from(1u64)), "0.000000000000000001");
    }

    #[test]
    fn formats_with_custom_decimals() {
        assert_eq!(format_units(U256::from(1234u64), 2), "12.34");
        assert_eq!(format_units(U256::from(1234u64), 0), "1234");
    }
}
