//! Deposit (`Mint`) events and their stable ordering.

use crate::domain::{Address, FixedPoint};

/// Scale of `mintAmount` on the cETH market: 1e18 = 1 ETH.
pub const MINT_AMOUNT_DECIMALS: u32 = 18;

/// A deposit event read from the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintEvent {
    pub depositor: Address,
    pub amount: FixedPoint,
    pub block_number: u64,
    pub log_index: u64,
}

impl MintEvent {
    pub fn new(depositor: Address, amount: FixedPoint, block_number: u64, log_index: u64) -> Self {
        Self {
            depositor,
            amount,
            block_number,
            log_index,
        }
    }

    pub fn position(&self) -> EventPosition {
        EventPosition {
            block_number: self.block_number,
            log_index: self.log_index,
        }
    }
}

/// Location of a log on chain. Ordering: block_number -> log_index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventPosition {
    pub block_number: u64,
    pub log_index: u64,
}
