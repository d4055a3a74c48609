pub mod deposits;
pub mod health;
pub mod liquidation;

use crate::config::Config;
use crate::orchestration::{DepositScanner, LiquidationService};
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub liquidation: Arc<LiquidationService>,
    pub scanner: Arc<DepositScanner>,
}

impl AppState {
    pub fn new(
        config: Config,
        liquidation: Arc<LiquidationService>,
        scanner: Arc<DepositScanner>,
    ) -> Self {
        Self {
            config,
            liquidation,
            scanner,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route(
            "/v1/liquidation-price",
            get(liquidation::get_liquidation_price),
        )
        .route("/v1/largest-deposit", get(deposits::get_largest_deposit))
        .layer(cors)
        .with_state(state)
}
