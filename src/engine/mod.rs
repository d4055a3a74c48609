//! Pure computation engine: planning, bounded fetch execution, aggregation
//! and valuation.

pub mod chunk_planner;
pub mod executor;
pub mod max_aggregator;
pub mod usd;
pub mod valuator;

pub use chunk_planner::{chunk_count, plan, plan_bounded, MAX_PLAN_CHUNKS};
pub use executor::{
    ChunkFailure, ChunkResults, ExecutorConfig, ExecutorError, FailedChunk, FailurePolicy,
    RangeQueryExecutor,
};
pub use max_aggregator::{reduce, MaxRecord};
pub use usd::{to_usd, USD_DECIMALS};
pub use valuator::{collateral_value, liquidation_price, valuate, LiquidationOutcome, PRICE_DECIMALS};
