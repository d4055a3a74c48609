use crate::domain::{BlockRange, Chunk, RangeError};

/// Most chunks [`plan`] will materialize for one range.
pub const MAX_PLAN_CHUNKS: u64 = 1_000_000;

/// Number of chunks `range` splits into at `max_width`, without building them.
pub fn chunk_count(range: BlockRange, max_width: u64) -> Result<u64, RangeError> {
    if max_width < 1 {
        return Err(RangeError::ZeroMaxWidth);
    }
    Ok(range.width().div_ceil(max_width))
}

/// Split `range` into consecutive chunks no wider than `max_width`.
///
/// The chunks tile the range exactly, in ascending order; only the last one
/// may be narrower. An empty range yields no chunks. Plans longer than
/// [`MAX_PLAN_CHUNKS`] are rejected with `TooManyChunks`.
pub fn plan(range: BlockRange, max_width: u64) -> Result<Vec<Chunk>, RangeError> {
    plan_bounded(range, max_width, MAX_PLAN_CHUNKS)
}

/// [`plan`] with a caller-chosen chunk limit, checked before anything is allocated.
pub fn plan_bounded(
    range: BlockRange,
    max_width: u64,
    max_chunks: u64,
) -> Result<Vec<Chunk>, RangeError> {
    let count = chunk_count(range, max_width)?;
    let max = max_chunks.min(MAX_PLAN_CHUNKS);
    if count > max {
        return Err(RangeError::TooManyChunks { chunks: count, max });
    }

    let mut chunks = Vec::with_capacity(count as usize);
    let mut start = range.start();
    while start < range.end() {
        let end = start.saturating_add(max_width).min(range.end());
        chunks.push(Chunk {
            index: chunks.len(),
            range: BlockRange::new(start, end)?,
        });
        start = end;
    }
    Ok(chunks)
}
