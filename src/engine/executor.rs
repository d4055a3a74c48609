//! Bounded-concurrency execution of per-chunk fetches.
//!
//! At most `concurrency_limit` fetch futures exist at any instant: a new chunk
//! is pulled from the plan only when an outstanding fetch completes. Each
//! result is moved once into the slot of its chunk, so the output is aligned
//! with the plan whatever the completion order.

use crate::datasource::DataSourceError;
use crate::domain::Chunk;
use futures::stream::{self, StreamExt};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// What to do when a single chunk's fetch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Abort the whole execution on the first failure.
    #[default]
    FailFast,
    /// Record the failure and keep going; the result lists failed chunks.
    Partial,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    pub concurrency_limit: usize,
    /// Widest chunk the remote source accepts.
    pub max_chunk_width: u64,
    pub failure_policy: FailurePolicy,
    /// Overall time budget; when it runs out, no further chunks are
    /// dispatched and in-flight fetches are dropped.
    pub deadline: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkFailure {
    Fetch(DataSourceError),
    Cancelled,
}

impl fmt::Display for ChunkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkFailure::Fetch(e) => write!(f, "{}", e),
            ChunkFailure::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A chunk that produced no result, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedChunk {
    pub chunk: Chunk,
    pub cause: ChunkFailure,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutorError {
    #[error("invalid executor config: {0}")]
    InvalidConfig(String),
    #[error("{chunk} spans {width} blocks but the source accepts at most {max}")]
    ChunkTooWide { chunk: Chunk, width: u64, max: u64 },
    #[error("fetch failed for {chunk}: {cause}")]
    ChunkFetchFailed { chunk: Chunk, cause: DataSourceError },
    #[error("cancelled after {completed} of {total} chunks")]
    Cancelled { completed: usize, total: usize },
}

/// Per-chunk results, aligned with the chunk sequence that was executed.
///
/// A slot is `None` exactly when its chunk is listed in `failed_chunks`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkResults<T> {
    slots: Vec<Option<Vec<T>>>,
    failed: Vec<FailedChunk>,
}

impl<T> ChunkResults<T> {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// True when every chunk produced a result.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn slots(&self) -> &[Option<Vec<T>>] {
        &self.slots
    }

    pub fn get(&self, index: usize) -> Option<&[T]> {
        self.slots.get(index).and_then(|s| s.as_deref())
    }

    /// Failed chunks in plan order.
    pub fn failed_chunks(&self) -> &[FailedChunk] {
        &self.failed
    }

    /// Results of the chunks that succeeded, in plan order.
    pub fn batches(&self) -> impl Iterator<Item = &[T]> {
        self.slots.iter().filter_map(|s| s.as_deref())
    }

    pub fn into_parts(self) -> (Vec<Option<Vec<T>>>, Vec<FailedChunk>) {
        (self.slots, self.failed)
    }
}

#[derive(Debug, Clone)]
pub struct RangeQueryExecutor {
    config: ExecutorConfig,
}

impl RangeQueryExecutor {
    pub fn new(config: ExecutorConfig) -> Result<Self, ExecutorError> {
        if config.concurrency_limit < 1 {
            return Err(ExecutorError::InvalidConfig(
                "concurrency limit must be at least 1".to_string(),
            ));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run `fetch` once per chunk and collect the results by chunk position.
    ///
    /// Chunks wider than `max_chunk_width` are rejected before anything is
    /// dispatched. Dropping the returned future abandons all in-flight fetches.
    pub async fn execute<T, F, Fut>(
        &self,
        chunks: &[Chunk],
        fetch: F,
    ) -> Result<ChunkResults<T>, ExecutorError>
    where
        F: Fn(Chunk) -> Fut,
        Fut: Future<Output = Result<Vec<T>, DataSourceError>>,
    {
        let max = self.config.max_chunk_width;
        if let Some(chunk) = chunks.iter().find(|c| c.range.width() > max) {
            return Err(ExecutorError::ChunkTooWide {
                chunk: *chunk,
                width: chunk.range.width(),
                max,
            });
        }

        let total = chunks.len();
        info!(
            "Executing {} chunks with concurrency {} ({:?})",
            total, self.config.concurrency_limit, self.config.failure_policy
        );

        let deadline = self.config.deadline.map(|t| Instant::now() + t);
        let mut slots: Vec<Option<Vec<T>>> = (0..total).map(|_| None).collect();
        let mut settled = vec![false; total];
        let mut failed = Vec::new();
        let mut completed = 0usize;

        let mut pending = stream::iter(chunks.iter().copied().enumerate())
            .map(|(slot, chunk)| {
                let fut = fetch(chunk);
                async move { (slot, chunk, fut.await) }
            })
            .buffer_unordered(self.config.concurrency_limit);

        loop {
            let next = match deadline {
                Some(at) => match tokio::time::timeout_at(at, pending.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        drop(pending);
                        warn!("Deadline reached after {} of {} chunks", completed, total);
                        return match self.config.failure_policy {
                            FailurePolicy::FailFast => {
                                Err(ExecutorError::Cancelled { completed, total })
                            }
                            FailurePolicy::Partial => {
                                for (slot, chunk) in chunks.iter().enumerate() {
                                    if !settled[slot] {
                                        failed.push(FailedChunk {
                                            chunk: *chunk,
                                            cause: ChunkFailure::Cancelled,
                                        });
                                    }
                                }
                                failed.sort_by_key(|f: &FailedChunk| f.chunk.index);
                                Ok(ChunkResults { slots, failed })
                            }
                        };
                    }
                },
                None => pending.next().await,
            };

            let Some((slot, chunk, result)) = next else {
                break;
            };
            completed += 1;
            settled[slot] = true;

            match result {
                Ok(items) => {
                    debug!("{} returned {} events", chunk, items.len());
                    slots[slot] = Some(items);
                }
                Err(cause) => {
                    warn!("{} failed: {}", chunk, cause);
                    match self.config.failure_policy {
                        FailurePolicy::FailFast => {
                            return Err(ExecutorError::ChunkFetchFailed { chunk, cause });
                        }
                        FailurePolicy::Partial => failed.push(FailedChunk {
                            chunk,
                            cause: ChunkFailure::Fetch(cause),
                        }),
                    }
                }
            }
        }

        failed.sort_by_key(|f| f.chunk.index);
        info!("Executed {} chunks, {} failed", total, failed.len());
        Ok(ChunkResults { slots, failed })
    }
}
