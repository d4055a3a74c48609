//! Liquidation price endpoint.

use crate::api::AppState;
use crate::domain::Address;
use crate::engine::LiquidationOutcome;
use crate::error::AppError;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Fractional digits of `priceDisplay`.
pub const PRICE_DISPLAY_PLACES: u32 = 6;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidationPriceQuery {
    pub user: String,
    /// Defaults to the configured cETH market.
    pub collateral_market: Option<String>,
    /// Defaults to the configured cDAI market.
    pub debt_market: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum LiquidationPriceResponse {
    #[serde(rename_all = "camelCase")]
    Price { price: String, price_display: String },
    Undefined { reason: String },
}

impl From<LiquidationOutcome> for LiquidationPriceResponse {
    fn from(outcome: LiquidationOutcome) -> Self {
        match outcome {
            LiquidationOutcome::Price { price } => LiquidationPriceResponse::Price {
                price: price.to_canonical_string(),
                price_display: price.to_display_string(PRICE_DISPLAY_PLACES),
            },
            LiquidationOutcome::NoDebt => LiquidationPriceResponse::Undefined {
                reason: "no_debt".to_string(),
            },
        }
    }
}

fn parse_address(raw: &str, field: &str) -> Result<Address, AppError> {
    Address::from_str(raw).map_err(|_| AppError::BadRequest(format!("Invalid {} address", field)))
}

pub async fn get_liquidation_price(
    Query(params): Query<LiquidationPriceQuery>,
    State(state): State<AppState>,
) -> Result<Json<LiquidationPriceResponse>, AppError> {
    let user = parse_address(&params.user, "user")?;
    let collateral_market = match params.collateral_market.as_deref() {
        Some(raw) => parse_address(raw, "collateralMarket")?,
        None => state.config.ceth_address.clone(),
    };
    let debt_market = match params.debt_market.as_deref() {
        Some(raw) => parse_address(raw, "debtMarket")?,
        None => state.config.cdai_address.clone(),
    };

    let outcome = state
        .liquidation
        .compute_liquidation_price(&user, &collateral_market, &debt_market)
        .await?;

    Ok(Json(outcome.into()))
}
