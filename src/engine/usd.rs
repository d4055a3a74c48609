//! Conversion of base-asset magnitudes to USD.

use crate::domain::{FixedPoint, FixedPointError, Rounding};

/// Scale of USD values.
pub const USD_DECIMALS: u32 = 18;

/// `amount * usd_per_unit`, rounded half up to [`USD_DECIMALS`].
pub fn to_usd(
    amount: &FixedPoint,
    usd_per_unit: &FixedPoint,
) -> Result<FixedPoint, FixedPointError> {
    Ok(amount
        .checked_mul(usd_per_unit)?
        .rescale(USD_DECIMALS, Rounding::HalfUp))
}
