//! Liquidation price of a borrower's position.

use crate::datasource::{DataSourceError, MarketSource};
use crate::domain::{Address, FixedPointError, Position};
use crate::engine::{valuate, LiquidationOutcome};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ValuationError {
    #[error("market {0} is not listed")]
    MarketNotListed(Address),
    #[error("arithmetic error: {0}")]
    Arithmetic(#[from] FixedPointError),
    #[error(transparent)]
    DataSource(#[from] DataSourceError),
}

#[derive(Clone)]
pub struct LiquidationService {
    markets: Arc<dyn MarketSource>,
}

impl LiquidationService {
    pub fn new(markets: Arc<dyn MarketSource>) -> Self {
        Self { markets }
    }

    /// Read `user`'s position fresh from the protocol.
    ///
    /// Both markets must be listed; otherwise `MarketNotListed` is returned
    /// and no position data is read.
    pub async fn fetch_position(
        &self,
        user: &Address,
        collateral_market: &Address,
        debt_market: &Address,
    ) -> Result<Position, ValuationError> {
        let (collateral, debt_listing) = tokio::try_join!(
            self.markets.get_market(collateral_market),
            self.markets.get_market(debt_market),
        )?;
        if !collateral.is_listed {
            return Err(ValuationError::MarketNotListed(collateral_market.clone()));
        }
        if !debt_listing.is_listed {
            return Err(ValuationError::MarketNotListed(debt_market.clone()));
        }

        let (balance, exchange_rate, debt) = tokio::try_join!(
            self.markets.get_balance(collateral_market, user),
            self.markets.get_exchange_rate(collateral_market),
            self.markets.get_debt(debt_market, user),
        )?;

        debug!(
            "Position of {}: balance {}, rate {}, factor {}, debt {}",
            user, balance, exchange_rate, collateral.collateral_factor, debt
        );

        Ok(Position {
            balance,
            exchange_rate,
            collateral_factor: collateral.collateral_factor,
            debt,
        })
    }

    /// Collateral per unit of debt at which `user` becomes liquidatable.
    pub async fn compute_liquidation_price(
        &self,
        user: &Address,
        collateral_market: &Address,
        debt_market: &Address,
    ) -> Result<LiquidationOutcome, ValuationError> {
        let position = self
            .fetch_position(user, collateral_market, debt_market)
            .await?;
        let outcome = valuate(&position)?;

        match &outcome {
            LiquidationOutcome::Price { price } => {
                info!("Liquidation price of {}: {}", user, price)
            }
            LiquidationOutcome::NoDebt => info!("{} has no debt, no liquidation price", user),
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::MockDataSource;
    use crate::domain::FixedPoint;
    use std::str::FromStr;

    const CETH: &str = "0x4Ddc2D193948926D02f9B1fE9e1daa0718270ED5";
    const CDAI: &str = "0x5d3a536E4D6DbD6114cc1Ead35777bAB948E3643";
    const USER: &str = "0x89F4e4bE0A78a63F12bE3094d35Fb58430D10A86";

    fn addr(s: &str) -> Address {
        Address::from_str(s).unwrap()
    }

    fn listed_markets() -> MockDataSource {
        MockDataSource::new()
            .with_market(&addr(CETH), true, "0.5".parse().unwrap())
            .with_market(&addr(CDAI), true, "0.75".parse().unwrap())
            .with_exchange_rate(&addr(CETH), FixedPoint::from_units(1u32, 18))
            .with_balance(&addr(CETH), &addr(USER), FixedPoint::from_units(4u32, 8))
    }

    #[tokio::test]
    async fn test_price_for_indebted_user() {
        let mock =
            listed_markets().with_debt(&addr(CDAI), &addr(USER), FixedPoint::from_units(1u32, 18));
        let service = LiquidationService::new(Arc::new(mock));

        let outcome = service
            .compute_liquidation_price(&addr(USER), &addr(CETH), &addr(CDAI))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            LiquidationOutcome::Price {
                price: FixedPoint::from_units(2u32, 18)
            }
        );
    }

    #[tokio::test]
    async fn test_no_debt_is_undefined() {
        let service = LiquidationService::new(Arc::new(listed_markets()));

        let outcome = service
            .compute_liquidation_price(&addr(USER), &addr(CETH), &addr(CDAI))
            .await
            .unwrap();
        assert_eq!(outcome, LiquidationOutcome::NoDebt);
    }

    #[tokio::test]
    async fn test_unlisted_collateral_market() {
        let mock = MockDataSource::new().with_market(&addr(CDAI), true, "0.75".parse().unwrap());
        let service = LiquidationService::new(Arc::new(mock));

        let err = service
            .compute_liquidation_price(&addr(USER), &addr(CETH), &addr(CDAI))
            .await
            .unwrap_err();
        match err {
            ValuationError::MarketNotListed(market) => {
                assert!(market.eq_ignore_case(&addr(CETH)))
            }
            other => panic!("Expected MarketNotListed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unlisted_debt_market() {
        let mock = MockDataSource::new().with_market(&addr(CETH), true, "0.5".parse().unwrap());
        let service = LiquidationService::new(Arc::new(mock));

        let err = service
            .compute_liquidation_price(&addr(USER), &addr(CETH), &addr(CDAI))
            .await
            .unwrap_err();
        assert!(matches!(err, ValuationError::MarketNotListed(m) if m == addr(CDAI)));
    }

    #[tokio::test]
    async fn test_data_source_error_propagates() {
        // Listed but no exchange rate configured.
        let mock = MockDataSource::new()
            .with_market(&addr(CETH), true, "0.5".parse().unwrap())
            .with_market(&addr(CDAI), true, "0.75".parse().unwrap())
            .with_debt(&addr(CDAI), &addr(USER), FixedPoint::from_units(1u32, 18));
        let service = LiquidationService::new(Arc::new(mock));

        let err = service
            .compute_liquidation_price(&addr(USER), &addr(CETH), &addr(CDAI))
            .await
            .unwrap_err();
        assert!(matches!(err, ValuationError::DataSource(_)));
    }
}
