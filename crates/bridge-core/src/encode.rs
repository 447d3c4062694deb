//! Fixed-point price encoding.
//!
//! The chain stores prices as unsigned integers; a decimal close price is
//! scaled by a fixed constant and rounded before submission. Uses
//! `rust_decimal` for exact decimal arithmetic, avoiding floating-point
//! rounding errors.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};

/// Fixed scale factor: four decimal places of price precision.
pub const PRICE_SCALE: u32 = 10_000;

/// A price encoded for on-chain storage.
///
/// Invariant: `value = round(decimal(close) * scale)`, rounded
/// half-away-from-zero, and `value >= 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EncodedPrice {
    /// Scaled integer value.
    pub value: u128,
    /// Scale factor the value was multiplied by.
    pub scale: u32,
}

impl fmt::Display for EncodedPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Encode a decimal price string as a scaled integer.
///
/// Parses `close` as an exact decimal, multiplies by [`PRICE_SCALE`], and
/// rounds to the nearest integer, half away from zero.
///
/// # Errors
/// Returns `CoreError::InvalidPrice` for non-numeric or negative input.
pub fn encode_price(close: &str) -> Result<EncodedPrice> {
    let decimal: Decimal = close
        .trim()
        .parse()
        .map_err(|_| CoreError::InvalidPrice(format!("not a decimal number: {close:?}")))?;

    if decimal.is_sign_negative() && !decimal.is_zero() {
        return Err(CoreError::InvalidPrice(format!(
            "negative price: {decimal}"
        )));
    }

    let scaled = (decimal * Decimal::from(PRICE_SCALE))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

    let value = scaled
        .to_u128()
        .ok_or_else(|| CoreError::InvalidPrice(format!("price out of range: {decimal}")))?;

    Ok(EncodedPrice {
        value,
        scale: PRICE_SCALE,
    })
}
