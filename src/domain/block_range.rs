//! Block ranges and the chunks a scan is split into.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("invalid range: start {start} is after end {end}")]
    StartAfterEnd { start: u64, end: u64 },
    #[error("invalid range: max chunk width must be at least 1")]
    ZeroMaxWidth,
    #[error("invalid range: {chunks} chunks exceed the limit of {max}")]
    TooManyChunks { chunks: u64, max: u64 },
}

/// Half-open block interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRange {
    start: u64,
    end: u64,
}

impl BlockRange {
    pub fn new(start: u64, end: u64) -> Result<Self, RangeError> {
        if start > end {
            return Err(RangeError::StartAfterEnd { start, end });
        }
        Ok(Self { start, end })
    }

    /// First block in the range.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// One past the last block in the range.
    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn width(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, block: u64) -> bool {
        block >= self.start && block < self.end
    }

    /// Last block in the range, for APIs taking inclusive bounds. `None` when empty.
    pub fn last_block(&self) -> Option<u64> {
        if self.is_empty() {
            None
        } else {
            Some(self.end - 1)
        }
    }
}

impl fmt::Display for BlockRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// A planned sub-range, identified by its position in the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Chunk {
    pub index: usize,
    pub range: BlockRange,
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chunk #{} {}", self.index, self.range)
    }
}
