//! Binance ticker client for the USD/ETH quote.

use super::{DataSourceError, PriceSource};
use crate::domain::FixedPoint;
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use rust_decimal::Decimal as RustDecimal;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

const ETH_USD_SYMBOL: &str = "ETHUSDT";

#[derive(Debug, Deserialize)]
struct TickerResponse {
    price: String,
}

/// Price source backed by Binance's public ticker endpoint.
#[derive(Debug, Clone)]
pub struct BinancePriceSource {
    client: Client,
    base_url: String,
}

impl BinancePriceSource {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    async fn get_ticker(&self, symbol: &str) -> Result<TickerResponse, DataSourceError> {
        let url = format!("{}/api/v3/ticker/price", self.base_url);
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self
                .client
                .get(&url)
                .query(&[("symbol", symbol)])
                .send()
                .await
                .map_err(|e| {
                    backoff::Error::transient(DataSourceError::NetworkError(e.to_string()))
                })?;

            let status = response.status();
            if status == 429 {
                return Err(backoff::Error::transient(DataSourceError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(DataSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(DataSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            response
                .json::<TickerResponse>()
                .await
                .map_err(|e| backoff::Error::permanent(DataSourceError::ParseError(e.to_string())))
        })
        .await
    }
}

#[async_trait]
impl PriceSource for BinancePriceSource {
    async fn usd_per_eth(&self) -> Result<FixedPoint, DataSourceError> {
        let ticker = self.get_ticker(ETH_USD_SYMBOL).await?;
        debug!("Fetched {} price {}", ETH_USD_SYMBOL, ticker.price);
        parse_price(&ticker.price)
    }
}

/// Quotes arrive as decimal strings; parse without passing through a float.
fn parse_price(price: &str) -> Result<FixedPoint, DataSourceError> {
    let value = RustDecimal::from_str(price)
        .map_err(|e| DataSourceError::ParseError(format!("Invalid price: {}", e)))?;
    if value.is_zero() || value.is_sign_negative() {
        return Err(DataSourceError::ParseError(format!(
            "Price must be positive, got {}",
            price
        )));
    }
    Ok(FixedPoint::from_decimal(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ticker_response() {
        let json = serde_json::json!({"symbol": "ETHUSDT", "price": "3456.78000000"});
        let ticker: TickerResponse = serde_json::from_value(json).unwrap();
        let price = parse_price(&ticker.price).unwrap();
        assert_eq!(price.decimals(), 8);
        assert_eq!(price.to_canonical_string(), "3456.78");
    }

    #[test]
    fn test_parse_price_rejects_non_positive() {
        assert!(parse_price("0.00000000").is_err());
        assert!(parse_price("-1").is_err());
        assert!(parse_price("NaN").is_err());
    }
}
