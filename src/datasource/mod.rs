//! Data source abstraction for the ledger, market metadata and price quotes.

use crate::domain::{Address, BlockRange, FixedPoint, Market, MintEvent};
use async_trait::async_trait;
use std::fmt;

pub mod compound;
pub mod mock;
pub mod price;
pub mod retry;

pub use compound::CompoundRpcSource;
pub use mock::MockDataSource;
pub use price::BinancePriceSource;
pub use retry::RetryingLedgerSource;

/// Historical event log of the deposit market.
#[async_trait]
pub trait LedgerSource: Send + Sync + fmt::Debug {
    /// Widest block range a single `fetch_mint_events` call accepts.
    fn max_block_range(&self) -> u64;

    /// Number of the most recent block the source knows about.
    async fn latest_block(&self) -> Result<u64, DataSourceError>;

    /// Fetch deposit events emitted within `range` (half-open).
    ///
    /// # Returns
    /// Events in any order; callers must not rely on the source sorting them.
    async fn fetch_mint_events(&self, range: BlockRange)
        -> Result<Vec<MintEvent>, DataSourceError>;
}

/// Per-market protocol state. Every amount carries the scale the protocol
/// defines for that field.
#[async_trait]
pub trait MarketSource: Send + Sync + fmt::Debug {
    /// cToken balance of `user` in `market`.
    async fn get_balance(
        &self,
        market: &Address,
        user: &Address,
    ) -> Result<FixedPoint, DataSourceError>;

    /// Current cToken -> underlying exchange rate of `market`.
    async fn get_exchange_rate(&self, market: &Address) -> Result<FixedPoint, DataSourceError>;

    /// Listing status and collateral factor of `market`.
    async fn get_market(&self, market: &Address) -> Result<Market, DataSourceError>;

    /// Borrow balance (with interest) of `user` in `market`, in underlying units.
    async fn get_debt(&self, market: &Address, user: &Address)
        -> Result<FixedPoint, DataSourceError>;
}

/// USD quote for the base asset.
#[async_trait]
pub trait PriceSource: Send + Sync + fmt::Debug {
    /// USD per 1 ETH.
    async fn usd_per_eth(&self) -> Result<FixedPoint, DataSourceError>;
}

/// Error type for data source operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSourceError {
    /// Network error (e.g., connection timeout, DNS failure)
    NetworkError(String),
    /// HTTP error (e.g., 429 rate limit, 5xx server error)
    HttpError { status: u16, message: String },
    /// Parsing error (invalid JSON, undecodable log or call result)
    ParseError(String),
    /// Rate limit exceeded
    RateLimited,
    /// The source refused a range wider than it supports
    RangeTooWide { requested: u64, max: u64 },
    /// Other error
    Other(String),
}

impl DataSourceError {
    /// Whether repeating the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            DataSourceError::NetworkError(_) | DataSourceError::RateLimited => true,
            DataSourceError::HttpError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl fmt::Display for DataSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSourceError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            DataSourceError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            DataSourceError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            DataSourceError::RateLimited => write!(f, "Rate limited"),
            DataSourceError::RangeTooWide { requested, max } => {
                write!(f, "Range of {} blocks exceeds maximum of {}", requested, max)
            }
            DataSourceError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for DataSourceError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datasource_error_display() {
        let err = DataSourceError::NetworkError("connection timeout".to_string());
        assert_eq!(err.to_string(), "Network error: connection timeout");

        let err = DataSourceError::HttpError {
            status: 429,
            message: "Too many requests".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP error 429: Too many requests");

        let err = DataSourceError::ParseError("invalid JSON".to_string());
        assert_eq!(err.to_string(), "Parse error: invalid JSON");

        let err = DataSourceError::RateLimited;
        assert_eq!(err.to_string(), "Rate limited");

        let err = DataSourceError::RangeTooWide {
            requested: 5000,
            max: 1000,
        };
        assert_eq!(err.to_string(), "Range of 5000 blocks exceeds maximum of 1000");
    }

    #[test]
    fn test_transient_classification() {
        assert!(DataSourceError::NetworkError("reset".to_string()).is_transient());
        assert!(DataSourceError::RateLimited.is_transient());
        assert!(DataSourceError::HttpError {
            status: 502,
            message: "Bad gateway".to_string()
        }
        .is_transient());
        assert!(!DataSourceError::HttpError {
            status: 400,
            message: "Bad request".to_string()
        }
        .is_transient());
        assert!(!DataSourceError::ParseError("bad log".to_string()).is_transient());
        assert!(!DataSourceError::RangeTooWide {
            requested: 2,
            max: 1
        }
        .is_transient());
    }
}
