//! Human amount strings ↔ fixed-point token units.
//!
//! Amounts typed into the swap card are decimal strings ("1.5"); contracts
//! take integers scaled by the token's decimals. Parsing goes through
//! `rust_decimal` so the scale of the input is known exactly.

use alloy::primitives::U256;
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnitsError {
    #[error("not a number: {0}")]
    NotANumber(String),
    #[error("negative amount: {0}")]
    Negative(String),
    #[error("amount must be greater than zero: {0}")]
    Zero(String),
    #[error("too many decimals for {decimals}-decimal token: {value}")]
    TooManyDecimals { value: String, decimals: u8 },
}

/// Parse a decimal string into token base units.
///
/// Rejects negative values and more fractional digits than the token carries.
pub fn parse_units(amount: &str, decimals: u8) -> Result<U256, UnitsError> {
    let trimmed = amount.trim();
    let value = Decimal::from_str(trimmed)
        .map_err(|_| UnitsError::NotANumber(trimmed.to_string()))?;

    if value.is_sign_negative() && !value.is_zero() {
        return Err(UnitsError::Negative(trimmed.to_string()));
    }

    let value = value.normalize();
    let scale = value.scale();
    if scale > decimals as u32 {
        return Err(UnitsError::TooManyDecimals {
            value: trimmed.to_string(),
            decimals,
        });
    }

    let mantissa = U256::from(value.mantissa().unsigned_abs());
    let factor = U256::from(10u64).pow(U256::from(decimals as u32 - scale));
    Ok(mantissa * factor)
}

/// `parse_units` for amounts that will be signed: zero is refused.
pub fn parse_positive_units(amount: &str, decimals: u8) -> Result<U256, UnitsError> {
    let value = parse_units(amount, decimals)?;
    if value.is_zero() {
        return Err(UnitsError::Zero(amount.trim().to_string()));
    }
    Ok(value)
}

/// Format base units as a decimal string, trimming trailing zeros but
/// keeping at least one fractional digit ("0.0", "1.5", "1000.0").
pub fn format_units(value: U256, decimals: u8) -> String {
    let digits = value.to_string();
    let decimals = decimals as usize;

    let (int_part, frac_part) = if digits.len() > decimals {
        let split = digits.len() - decimals;
        (digits[..split].to_string(), digits[split..].to_string())
    } else {
        ("0".to_string(), format!("{digits:0>decimals$}"))
    };

    let frac = frac_part.trim_end_matches('0');
    if frac.is_empty() {
        format!("{int_part}.0")
    } else {
        format!("{int_part}.{frac}")
    }
}

/// Format base units with a fixed number of fractional digits, truncating.
pub fn format_fixed(value: U256, decimals: u8, places: usize) -> String {
    let full = format_units(value, decimals);
    let (int_part, frac) = full.split_once('.').unwrap_or((full.as_str(), ""));
    let mut frac: String = frac.chars().take(places).collect();
    while frac.len() < places {
        frac.push('0');
    }
    if places == 0 {
        int_part.to_string()
    } else {
        format!("{int_part}.{frac}")
    }
}

/// True when the string parses to a strictly positive number.
pub fn is_positive_amount(amount: &str) -> bool {
    Decimal::from_str(amount.trim())
        .map(|d| d > Decimal::ZERO)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_units_refuse_zero() {
        assert_eq!(
            parse_positive_units("0", 6),
            Err(UnitsError::Zero("0".to_string()))
        );
        assert!(matches!(parse_positive_units("0.000", 18), Err(UnitsError::Zero(_))));
        assert_eq!(parse_positive_units("0.000001", 6).unwrap(), U256::from(1u64));
    }

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_units("10", 6).unwrap(), U256::from(10_000_000u64));
        assert_eq!(
            parse_units("1.5", 18).unwrap(),
            U256::from(1_500_000_000_000_000_000u128)
        );
        assert_eq!(parse_units("0.000001", 6).unwrap(), U256::from(1u64));
        assert_eq!(parse_units("2.50", 6).unwrap(), U256::from(2_500_000u64));
        assert_eq!(parse_units("0", 6).unwrap(), U256::ZERO);
    }

    #[test]
    fn test_parse_units_rejects() {
        assert!(matches!(
            parse_units("0.0000001", 6),
            Err(UnitsError::TooManyDecimals { decimals: 6, .. })
        ));
        assert!(matches!(parse_units("-1", 6), Err(UnitsError::Negative(_))));
        assert!(matches!(parse_units("abc", 6), Err(UnitsError::NotANumber(_))));
        assert!(matches!(parse_units("", 6), Err(UnitsError::NotANumber(_))));
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(U256::ZERO, 6), "0.0");
        assert_eq!(format_units(U256::from(1_500_000u64), 6), "1.5");
        assert_eq!(format_units(U256::from(1u64), 6), "0.000001");
        assert_eq!(format_units(U256::from(1_000_000_000u64), 6), "1000.0");
        assert_eq!(
            format_units(U256::from(1_234_500_000_000_000_000u128), 18),
            "1.2345"
        );
    }

    #[test]
    fn test_format_fixed() {
        assert_eq!(format_fixed(U256::from(1_239_999u64), 6, 2), "1.23");
        assert_eq!(format_fixed(U256::ZERO, 18, 6), "0.000000");
        assert_eq!(format_fixed(U256::from(5_000_000u64), 6, 0), "5");
    }

    #[test]
    fn test_format_then_parse() {
        let raw = U256::from(987_654_321_000_000_000u128);
        assert_eq!(parse_units(&format_units(raw, 18), 18).unwrap(), raw);
    }

    #[test]
    fn test_positive_amount() {
        assert!(is_positive_amount("0.1"));
        assert!(!is_positive_amount("0"));
        assert!(!is_positive_amount(""));
        assert!(!is_positive_amount("-3"));
        assert!(!is_positive_amount("x"));
    }
}
