use crate::engine::ExecutorError;
use crate::orchestration::{ScanError, ValuationError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Market not listed: {0}")]
    MarketNotListed(String),
    #[error("Upstream error: {0}")]
    Upstream(String),
    #[error("Timed out: {0}")]
    Timeout(String),
}

impl From<ValuationError> for AppError {
    fn from(err: ValuationError) -> Self {
        match err {
            ValuationError::MarketNotListed(market) => {
                AppError::MarketNotListed(market.to_string())
            }
            ValuationError::Arithmetic(e) => AppError::Internal(e.to_string()),
            ValuationError::DataSource(e) => AppError::Upstream(e.to_string()),
        }
    }
}

impl From<ScanError> for AppError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::InvalidRange(e) => AppError::BadRequest(e.to_string()),
            ScanError::Executor(e @ ExecutorError::InvalidConfig(_))
            | ScanError::Executor(e @ ExecutorError::ChunkTooWide { .. }) => {
                AppError::BadRequest(e.to_string())
            }
            ScanError::Executor(e @ ExecutorError::ChunkFetchFailed { .. }) => {
                AppError::Upstream(e.to_string())
            }
            ScanError::Executor(e @ ExecutorError::Cancelled { .. }) => {
                AppError::Timeout(e.to_string())
            }
            ScanError::Price(e) => AppError::Upstream(format!("price quote unavailable: {}", e)),
            ScanError::Arithmetic(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, error_message) = match self {
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, None, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, None, msg),
            AppError::MarketNotListed(market) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Some("market_not_listed"),
                format!("market {} is not listed", market),
            ),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, None, msg),
            AppError::Timeout(msg) => (StatusCode::GATEWAY_TIMEOUT, None, msg),
        };

        let body = match code {
            Some(code) => Json(json!({
                "error": error_message,
                "code": code,
            })),
            None => Json(json!({
                "error": error_message,
            })),
        };

        (status, body).into_response()
    }
}
