//! Largest-deposit scan over a block range.

use crate::datasource::{DataSourceError, LedgerSource, PriceSource};
use crate::domain::{BlockRange, FixedPoint, FixedPointError, RangeError};
use crate::engine::{
    plan_bounded, reduce, to_usd, ExecutorConfig, ExecutorError, FailedChunk, FailurePolicy,
    MaxRecord, RangeQueryExecutor, MAX_PLAN_CHUNKS, USD_DECIMALS,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Outcome of a deposit scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LargestDeposit {
    /// The winning event, or the zero record when the range holds no deposit.
    pub record: MaxRecord,
    pub amount_usd: FixedPoint,
    /// Quote used for `amount_usd`; `None` when nothing had to be priced.
    pub usd_per_eth: Option<FixedPoint>,
    pub chunks_planned: usize,
    /// Chunks that produced no events under the partial failure policy.
    pub failed_chunks: Vec<FailedChunk>,
}

impl LargestDeposit {
    /// True when every chunk of the range was scanned.
    pub fn is_complete(&self) -> bool {
        self.failed_chunks.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    InvalidRange(#[from] RangeError),
    #[error(transparent)]
    Executor(#[from] ExecutorError),
    #[error("price quote unavailable: {0}")]
    Price(DataSourceError),
    #[error(transparent)]
    Arithmetic(#[from] FixedPointError),
}

#[derive(Clone)]
pub struct DepositScanner {
    ledger: Arc<dyn LedgerSource>,
    prices: Arc<dyn PriceSource>,
    failure_policy: FailurePolicy,
    deadline: Option<Duration>,
    max_chunks: u64,
}

impl DepositScanner {
    pub fn new(ledger: Arc<dyn LedgerSource>, prices: Arc<dyn PriceSource>) -> Self {
        Self {
            ledger,
            prices,
            failure_policy: FailurePolicy::default(),
            deadline: None,
            max_chunks: MAX_PLAN_CHUNKS,
        }
    }

    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    /// Refuse scans that would plan more than `max_chunks` chunks.
    pub fn with_max_chunks(mut self, max_chunks: u64) -> Self {
        self.max_chunks = max_chunks;
        self
    }

    /// Abandon the scan once `deadline` has elapsed.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Head of the chain as the ledger sees it.
    pub async fn latest_block(&self) -> Result<u64, DataSourceError> {
        self.ledger.latest_block().await
    }

    /// Find the largest single deposit in `range` and value it in USD.
    ///
    /// The range is split into chunks of at most `max_chunk_width` blocks,
    /// fetched with at most `concurrency_limit` requests in flight. Chunks
    /// wider than the ledger's own limit are rejected before any request.
    pub async fn find_largest_deposit(
        &self,
        range: BlockRange,
        max_chunk_width: u64,
        concurrency_limit: usize,
    ) -> Result<LargestDeposit, ScanError> {
        let chunks = plan_bounded(range, max_chunk_width, self.max_chunks)?;
        let executor = RangeQueryExecutor::new(ExecutorConfig {
            concurrency_limit,
            max_chunk_width: self.ledger.max_block_range(),
            failure_policy: self.failure_policy,
            deadline: self.deadline,
        })?;

        info!(
            "Scanning {} for deposits in {} chunks of up to {} blocks",
            range,
            chunks.len(),
            max_chunk_width
        );

        let ledger = &self.ledger;
        let results = executor
            .execute(&chunks, |chunk| ledger.fetch_mint_events(chunk.range))
            .await?;

        let record = reduce(results.batches());
        let (_, failed_chunks) = results.into_parts();

        if record.is_empty() {
            info!("No deposits found in {}", range);
            return Ok(LargestDeposit {
                record,
                amount_usd: FixedPoint::zero(USD_DECIMALS),
                usd_per_eth: None,
                chunks_planned: chunks.len(),
                failed_chunks,
            });
        }

        let usd_per_eth = self.prices.usd_per_eth().await.map_err(ScanError::Price)?;
        let amount_usd = to_usd(&record.amount, &usd_per_eth)?;

        info!(
            "Largest deposit in {}: {} ETH ({} USD) at block {:?}",
            range,
            record.amount,
            amount_usd.to_display_string(2),
            record.block_number
        );

        Ok(LargestDeposit {
            record,
            amount_usd,
            usd_per_eth: Some(usd_per_eth),
            chunks_planned: chunks.len(),
            failed_chunks,
        })
    }
}
