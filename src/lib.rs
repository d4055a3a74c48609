pub mod api;
pub mod config;
pub mod datasource;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;

pub use config::Config;
pub use datasource::{
    DataSourceError, LedgerSource, MarketSource, MockDataSource, PriceSource,
};
pub use domain::{Address, BlockRange, Chunk, FixedPoint, MintEvent, Position};
pub use engine::{LiquidationOutcome, MaxRecord};
pub use error::AppError;
pub use orchestration::{DepositScanner, LargestDeposit, LiquidationService};
