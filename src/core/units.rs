//! Decimal amount conversion
//!
//! Humans write "0.025" coins or "1000000" tokens; ledgers store base units.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

/// Unit conversion errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnitsError {
    #[error("Invalid amount: {0}")]
    Invalid(String),
    #[error("Negative amount: {0}")]
    Negative(String),
    #[error("Too many decimal places in {amount}: at most {decimals}")]
    TooPrecise { amount: String, decimals: u32 },
    #[error("Amount out of range: {0}")]
    OutOfRange(String),
    #[error("Unsupported decimals: {0}")]
    UnsupportedDecimals(u32),
}

/// Parse a decimal string into base units with `decimals` fractional digits
///
/// ```rust
/// use crowdsale::core::parse_units;
///
/// assert_eq!(parse_units("0.025", 18).unwrap(), 25_000_000_000_000_000);
/// assert_eq!(parse_units("10", 0).unwrap(), 10);
/// ```
pub fn parse_units(amount: &str, decimals: u32) -> Result<u128, UnitsError> {
    if decimals > 18 {
        return Err(UnitsError::UnsupportedDecimals(decimals));
    }

    let value =
        Decimal::from_str(amount.trim()).map_err(|_| UnitsError::Invalid(amount.to_string()))?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(UnitsError::Negative(amount.to_string()));
    }

    let scaled = value
        .checked_mul(Decimal::from(10u64.pow(decimals)))
        .ok_or_else(|| UnitsError::OutOfRange(amount.to_string()))?;
    if !scaled.fract().is_zero() {
        return Err(UnitsError::TooPrecise {
            amount: amount.to_string(),
            decimals,
        });
    }

    scaled
        .trunc()
        .to_u128()
        .ok_or_else(|| UnitsError::OutOfRange(amount.to_string()))
}

/// Format base units as a decimal string, trimming trailing zeros
pub fn format_units(amount: u128, decimals: u32) -> String {
    let unit = 10u128.pow(decimals);
    let whole = amount / unit;
    let frac = amount % unit;

    if frac == 0 {
        return whole.to_string();
    }

    let digits = format!("{:0width$}", frac, width = decimals as usize);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}
