//! Retry decorator for ledger fetches.

use super::{DataSourceError, LedgerSource};
use crate::domain::{BlockRange, MintEvent};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use std::time::Duration;
use tracing::warn;

/// Wraps a [`LedgerSource`] and retries transient failures with exponential backoff.
///
/// Permanent errors (parse failures, ranges the source refuses) surface on the
/// first attempt.
#[derive(Debug, Clone)]
pub struct RetryingLedgerSource<S> {
    inner: S,
    backoff: ExponentialBackoff,
}

impl<S: LedgerSource> RetryingLedgerSource<S> {
    /// Retry for at most `max_elapsed` per fetch.
    pub fn new(inner: S, max_elapsed: Duration) -> Self {
        Self::with_backoff(
            inner,
            ExponentialBackoff {
                max_elapsed_time: Some(max_elapsed),
                ..Default::default()
            },
        )
    }

    pub fn with_backoff(inner: S, backoff: ExponentialBackoff) -> Self {
        Self { inner, backoff }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: LedgerSource> LedgerSource for RetryingLedgerSource<S> {
    fn max_block_range(&self) -> u64 {
        self.inner.max_block_range()
    }

    // Not retried: callers probing the head want the current answer.
    async fn latest_block(&self) -> Result<u64, DataSourceError> {
        self.inner.latest_block().await
    }

    async fn fetch_mint_events(
        &self,
        range: BlockRange,
    ) -> Result<Vec<MintEvent>, DataSourceError> {
        retry(self.backoff.clone(), || async {
            self.inner.fetch_mint_events(range).await.map_err(|e| {
                if e.is_transient() {
                    warn!("Transient failure fetching {}: {}", range, e);
                    backoff::Error::transient(e)
                } else {
                    backoff::Error::permanent(e)
                }
            })
        })
        .await
    }
}
