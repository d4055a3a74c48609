//! Borrower position and market metadata, fetched fresh per query.

use crate::domain::FixedPoint;

/// Collateral and debt figures for one borrower, each at its protocol scale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    /// cToken balance of the collateral market.
    pub balance: FixedPoint,
    /// cToken -> underlying conversion of the collateral market.
    pub exchange_rate: FixedPoint,
    /// Fraction of collateral value that may be borrowed against.
    pub collateral_factor: FixedPoint,
    /// Borrow balance in units of the debt market's underlying.
    pub debt: FixedPoint,
}

/// Comptroller view of a market.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Market {
    pub is_listed: bool,
    pub collateral_factor: FixedPoint,
}
