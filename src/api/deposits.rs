//! Largest deposit endpoint.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::domain::BlockRange;
use crate::engine::FailedChunk;
use crate::error::AppError;
use crate::orchestration::LargestDeposit;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LargestDepositQuery {
    pub from_block: u64,
    /// Exclusive upper bound.
    pub to_block: u64,
    pub max_chunk_width: Option<u64>,
    pub concurrency_limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LargestDepositResponse {
    pub from_block: u64,
    pub to_block: u64,
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depositor: Option<String>,
    /// ETH.
    pub amount: String,
    pub amount_usd: String,
    pub amount_usd_display: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usd_per_eth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_index: Option<u64>,
    pub chunks_planned: usize,
    pub complete: bool,
    pub failed_chunks: Vec<FailedChunkDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedChunkDto {
    pub index: usize,
    pub from_block: u64,
    pub to_block: u64,
    pub cause: String,
}

impl From<&FailedChunk> for FailedChunkDto {
    fn from(failed: &FailedChunk) -> Self {
        Self {
            index: failed.chunk.index,
            from_block: failed.chunk.range.start(),
            to_block: failed.chunk.range.end(),
            cause: failed.cause.to_string(),
        }
    }
}

impl LargestDepositResponse {
    fn new(range: BlockRange, result: LargestDeposit) -> Self {
        let record = result.record;
        Self {
            from_block: range.start(),
            to_block: range.end(),
            found: !record.is_empty(),
            depositor: record.depositor.map(|d| d.to_string()),
            amount: record.amount.to_canonical_string(),
            amount_usd: result.amount_usd.to_canonical_string(),
            amount_usd_display: result.amount_usd.to_display_string(2),
            usd_per_eth: result.usd_per_eth.map(|p| p.to_canonical_string()),
            block_number: record.block_number,
            log_index: record.log_index,
            chunks_planned: result.chunks_planned,
            complete: result.failed_chunks.is_empty(),
            failed_chunks: result.failed_chunks.iter().map(FailedChunkDto::from).collect(),
        }
    }
}

pub async fn get_largest_deposit(
    Query(params): Query<LargestDepositQuery>,
    State(state): State<AppState>,
) -> Result<Json<LargestDepositResponse>, AppError> {
    let range = BlockRange::new(params.from_block, params.to_block)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let max_chunk_width = params
        .max_chunk_width
        .unwrap_or(state.config.max_chunk_width);
    let concurrency_limit = params
        .concurrency_limit
        .unwrap_or(state.config.concurrency_limit);

    let result = state
        .scanner
        .find_largest_deposit(range, max_chunk_width, concurrency_limit)
        .await?;

    Ok(Json(LargestDepositResponse::new(range, result)))
}
