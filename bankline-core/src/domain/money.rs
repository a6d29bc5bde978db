//! Conversion between decimal amounts and stored minor units

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::result::{Error, Result};

/// Decimal places of a minor unit (cents)
pub const MINOR_UNIT_SCALE: u32 = 2;

/// Convert a decimal amount such as `12.34` into minor units (`1234`)
///
/// Amounts with more precision than a minor unit are rejected rather than rounded.
pub fn to_minor_units(amount: Decimal) -> Result<i64> {
    let scaled = amount
        .checked_mul(Decimal::from(10i64.pow(MINOR_UNIT_SCALE)))
        .ok_or_else(|| Error::validation(format!("amount {} is out of range", amount)))?;
    if scaled.fract() != Decimal::ZERO {
        return Err(Error::validation(format!(
            "amount {} has more than {} decimal places",
            amount, MINOR_UNIT_SCALE
        )));
    }
    scaled
        .to_i64()
        .ok_or_else(|| Error::validation(format!("amount {} is out of range", amount)))
}

/// Convert stored minor units back into a decimal amount
pub fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, MINOR_UNIT_SCALE)
}
