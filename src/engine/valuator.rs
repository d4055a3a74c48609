//! Liquidation price of a borrower position.

use crate::domain::{FixedPoint, FixedPointError, Position, Rounding};

/// Scale every valuation result is expressed at.
pub const PRICE_DECIMALS: u32 = 18;

/// Result of valuing a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiquidationOutcome {
    /// Collateral per unit of debt at which the position is liquidatable.
    Price { price: FixedPoint },
    /// The borrower owes nothing, so no liquidation price exists.
    NoDebt,
}

/// Risk-adjusted collateral value, at [`PRICE_DECIMALS`].
///
/// `balance * exchange_rate * collateral_factor`, computed exactly and then
/// truncated once.
pub fn collateral_value(
    balance: &FixedPoint,
    exchange_rate: &FixedPoint,
    collateral_factor: &FixedPoint,
) -> Result<FixedPoint, FixedPointError> {
    Ok(balance
        .checked_mul(exchange_rate)?
        .checked_mul(collateral_factor)?
        .rescale(PRICE_DECIMALS, Rounding::Truncate))
}

/// Price `p` solving `debt * p == collateral`, at [`PRICE_DECIMALS`], truncated.
///
/// # Errors
/// `DivisionByZero` when `debt` is zero.
pub fn liquidation_price(
    balance: &FixedPoint,
    exchange_rate: &FixedPoint,
    collateral_factor: &FixedPoint,
    debt: &FixedPoint,
) -> Result<FixedPoint, FixedPointError> {
    let collateral = collateral_value(balance, exchange_rate, collateral_factor)?;
    collateral.checked_div(debt, PRICE_DECIMALS, Rounding::Truncate)
}

/// Value a position, reporting zero debt as [`LiquidationOutcome::NoDebt`].
pub fn valuate(position: &Position) -> Result<LiquidationOutcome, FixedPointError> {
    if position.debt.is_zero() {
        return Ok(LiquidationOutcome::NoDebt);
    }
    let price = liquidation_price(
        &position.balance,
        &position.exchange_rate,
        &position.collateral_factor,
        &position.debt,
    )?;
    Ok(LiquidationOutcome::Price { price })
}
