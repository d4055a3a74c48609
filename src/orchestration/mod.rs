//! Public operations wiring the engine to the data sources.

pub mod liquidation;
pub mod scanner;

pub use liquidation::{LiquidationService, ValuationError};
pub use scanner::{DepositScanner, LargestDeposit, ScanError};
