//! Domain types for the lending scanner.
//!
//! This module provides:
//! - Lossless scaled magnitudes via the FixedPoint type
//! - Block ranges and planned chunks
//! - Mint events with a stable on-chain ordering
//! - Borrower position and market metadata

pub mod block_range;
pub mod fixed_point;
pub mod mint_event;
pub mod position;
pub mod primitives;

pub use block_range::{BlockRange, Chunk, RangeError};
pub use fixed_point::{FixedPoint, FixedPointError, Rounding};
pub use mint_event::{EventPosition, MintEvent, MINT_AMOUNT_DECIMALS};
pub use position::{Market, Position};
pub use primitives::{Address, AddressParseError};
