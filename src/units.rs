//! Integer amount conversions
//!
//! Every amount in this crate is a `U256` in the smallest unit of its
//! currency. This module is the only place that turns those integers into
//! decimal strings (and back) or reads/writes JSON-RPC hex quantities.
//! No floating point is involved anywhere.

use crate::{Error, Result};
use alloy::primitives::U256;

/// Fractional digits of the native currency.
pub const NATIVE_DECIMALS: u8 = 18;

fn scale(decimals: u8) -> Result<U256> {
    U256::from(10u64)
        .checked_pow(U256::from(decimals))
        .ok_or_else(|| Error::InvalidArgument(format!("{} decimals overflow 256 bits", decimals)))
}

/// Split an amount into its whole and fractional parts.
///
/// `whole * 10^decimals + fraction == value` and `fraction < 10^decimals`.
pub fn split_units(value: U256, decimals: u8) -> Result<(U256, U256)> {
    let divisor = scale(decimals)?;
    Ok((value / divisor, value % divisor))
}

/// Format a smallest-unit amount as a decimal string with trailing zeros stripped.
pub fn format_units(value: U256, decimals: u8) -> Result<String> {
    let (whole, remainder) = split_units(value, decimals)?;

    if remainder.is_zero() {
        return Ok(whole.to_string());
    }

    let remainder_str = format!("{:0>width$}", remainder.to_string(), width = decimals as usize);
    let trimmed = remainder_str.trim_end_matches('0');
    Ok(format!("{}.{}", whole, trimmed))
}

/// Parse a decimal string such as `"0.01"` or `"100"` into smallest units.
///
/// More fractional digits than `decimals` is an error rather than a rounding.
pub fn parse_units(amount: &str, decimals: u8) -> Result<U256> {
    let amount = amount.trim();
    let (whole, fraction) = match amount.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (amount, ""),
    };

    let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if whole.is_empty() || !is_digits(whole) || !is_digits(fraction) {
        return Err(Error::InvalidArgument(format!(
            "'{}' is not a decimal amount",
            amount
        )));
    }
    if amount.ends_with('.') {
        return Err(Error::InvalidArgument(format!(
            "'{}' has an empty fractional part",
            amount
        )));
    }
    if fraction.len() > decimals as usize {
        return Err(Error::InvalidArgument(format!(
            "'{}' has more than {} fractional digits",
            amount, decimals
        )));
    }

    let overflow = || Error::InvalidArgument(format!("'{}' overflows 256 bits", amount));
    let whole = U256::from_str_radix(whole, 10).map_err(|_| overflow())?;
    let padded = format!("{:0<width$}", fraction, width = decimals as usize);
    let fraction = if padded.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(&padded, 10).map_err(|_| overflow())?
    };

    whole
        .checked_mul(scale(decimals)?)
        .and_then(|w| w.checked_add(fraction))
        .ok_or_else(overflow)
}

/// Parse a JSON-RPC hex quantity. `"0x"` is read as zero.
pub fn parse_quantity(quantity: &str) -> Result<U256> {
    let digits = quantity.strip_prefix("0x").ok_or_else(|| {
        Error::InvalidArgument(format!("'{}' is not a 0x-prefixed quantity", quantity))
    })?;
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 16)
        .map_err(|e| Error::InvalidArgument(format!("'{}' is not a hex quantity: {}", quantity, e)))
}

/// Encode a JSON-RPC hex quantity (`0x0` for zero, no leading zeros).
pub fn to_quantity(value: U256) -> String {
    if value.is_zero() {
        return "0x0".to_string();
    }
    format!("0x{:x}", value)
}
