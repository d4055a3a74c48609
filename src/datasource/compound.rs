//! Compound v2 JSON-RPC data source.

use super::{DataSourceError, LedgerSource, MarketSource};
use crate::domain::{Address, BlockRange, FixedPoint, Market, MintEvent, MINT_AMOUNT_DECIMALS};
use alloy::primitives::{Address as EvmAddress, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::{Filter, Log};
use alloy::sol;
use alloy::sol_types::SolEvent;
use alloy::transports::{RpcError, TransportError, TransportErrorKind};
use async_trait::async_trait;
use num_bigint::{BigInt, Sign};
use std::fmt;
use tracing::{debug, warn};

/// Mantissa scale of the Comptroller's collateral factor.
const COLLATERAL_FACTOR_DECIMALS: u32 = 18;
/// Decimals of ether, the underlying of cETH.
const ETHER_DECIMALS: u32 = 18;

sol! {
    #[sol(rpc)]
    interface ICToken {
        event Mint(address minter, uint256 mintAmount, uint256 mintTokens);

        function balanceOf(address owner) external view returns (uint256);
        function exchangeRateCurrent() external returns (uint256);
        function borrowBalanceCurrent(address account) external returns (uint256);
        function decimals() external view returns (uint8);
        function underlying() external view returns (address);
    }

    #[sol(rpc)]
    interface IComptroller {
        function markets(address cToken) external view returns (bool isListed, uint256 collateralFactorMantissa, bool isComped);
    }

    #[sol(rpc)]
    interface IERC20Metadata {
        function decimals() external view returns (uint8);
    }
}

/// Reads cToken state, Comptroller listings and cETH `Mint` logs over JSON-RPC.
#[derive(Clone)]
pub struct CompoundRpcSource {
    provider: DynProvider,
    rpc_url: String,
    deposit_market: EvmAddress,
    comptroller: EvmAddress,
    max_block_range: u64,
}

impl fmt::Debug for CompoundRpcSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompoundRpcSource")
            .field("rpc_url", &self.rpc_url)
            .field("deposit_market", &self.deposit_market)
            .field("comptroller", &self.comptroller)
            .field("max_block_range", &self.max_block_range)
            .finish()
    }
}

impl CompoundRpcSource {
    /// Connect over HTTP.
    ///
    /// `deposit_market` is the cToken whose `Mint` events are scanned (cETH);
    /// its underlying is taken to be ether.
    pub fn connect(
        rpc_url: &str,
        deposit_market: &Address,
        comptroller: &Address,
        max_block_range: u64,
    ) -> Result<Self, DataSourceError> {
        let url = rpc_url
            .parse()
            .map_err(|e| DataSourceError::Other(format!("Invalid RPC URL: {}", e)))?;
        let provider = ProviderBuilder::new().connect_http(url).erased();

        Ok(Self {
            provider,
            rpc_url: rpc_url.to_string(),
            deposit_market: to_evm_address(deposit_market)?,
            comptroller: to_evm_address(comptroller)?,
            max_block_range,
        })
    }

    async fn ctoken_decimals(&self, market: EvmAddress) -> Result<u32, DataSourceError> {
        let decimals = ICToken::new(market, self.provider.clone())
            .decimals()
            .call()
            .await
            .map_err(map_contract_error)?;
        Ok(u32::from(decimals))
    }

    async fn underlying_decimals(&self, market: EvmAddress) -> Result<u32, DataSourceError> {
        if market == self.deposit_market {
            return Ok(ETHER_DECIMALS);
        }
        let underlying = ICToken::new(market, self.provider.clone())
            .underlying()
            .call()
            .await
            .map_err(map_contract_error)?;
        let decimals = IERC20Metadata::new(underlying, self.provider.clone())
            .decimals()
            .call()
            .await
            .map_err(map_contract_error)?;
        Ok(u32::from(decimals))
    }
}

#[async_trait]
impl LedgerSource for CompoundRpcSource {
    fn max_block_range(&self) -> u64 {
        self.max_block_range
    }

    async fn latest_block(&self) -> Result<u64, DataSourceError> {
        self.provider
            .get_block_number()
            .await
            .map_err(map_transport_error)
    }

    async fn fetch_mint_events(
        &self,
        range: BlockRange,
    ) -> Result<Vec<MintEvent>, DataSourceError> {
        if range.width() > self.max_block_range {
            return Err(DataSourceError::RangeTooWide {
                requested: range.width(),
                max: self.max_block_range,
            });
        }
        // eth_getLogs bounds are inclusive.
        let Some(last_block) = range.last_block() else {
            return Ok(Vec::new());
        };

        debug!("Fetching Mint logs for blocks {}", range);

        let filter = Filter::new()
            .address(self.deposit_market)
            .event_signature(ICToken::Mint::SIGNATURE_HASH)
            .from_block(range.start())
            .to_block(last_block);

        let logs = self
            .provider
            .get_logs(&filter)
            .await
            .map_err(map_transport_error)?;

        let mut events = Vec::with_capacity(logs.len());
        for log in &logs {
            if log.removed {
                warn!("Skipping removed log in {}", range);
                continue;
            }
            events.push(decode_mint(log)?);
        }
        Ok(events)
    }
}

#[async_trait]
impl MarketSource for CompoundRpcSource {
    async fn get_balance(
        &self,
        market: &Address,
        user: &Address,
    ) -> Result<FixedPoint, DataSourceError> {
        let market = to_evm_address(market)?;
        let user = to_evm_address(user)?;
        let balance = ICToken::new(market, self.provider.clone())
            .balanceOf(user)
            .call()
            .await
            .map_err(map_contract_error)?;
        let decimals = self.ctoken_decimals(market).await?;
        Ok(u256_to_fixed(balance, decimals))
    }

    async fn get_exchange_rate(&self, market: &Address) -> Result<FixedPoint, DataSourceError> {
        let market = to_evm_address(market)?;
        let rate = ICToken::new(market, self.provider.clone())
            .exchangeRateCurrent()
            .call()
            .await
            .map_err(map_contract_error)?;

        // underlying = cTokens * rate / 1e18, so the rate carries
        // 18 + underlying_decimals - ctoken_decimals decimals.
        let ctoken_decimals = self.ctoken_decimals(market).await?;
        let underlying_decimals = self.underlying_decimals(market).await?;
        let decimals = (18 + underlying_decimals).checked_sub(ctoken_decimals).ok_or_else(|| {
            DataSourceError::ParseError(format!(
                "Unsupported decimals: cToken {}, underlying {}",
                ctoken_decimals, underlying_decimals
            ))
        })?;
        Ok(u256_to_fixed(rate, decimals))
    }

    async fn get_market(&self, market: &Address) -> Result<Market, DataSourceError> {
        let market = to_evm_address(market)?;
        let info = IComptroller::new(self.comptroller, self.provider.clone())
            .markets(market)
            .call()
            .await
            .map_err(map_contract_error)?;
        Ok(Market {
            is_listed: info.isListed,
            collateral_factor: u256_to_fixed(info.collateralFactorMantissa, COLLATERAL_FACTOR_DECIMALS),
        })
    }

    async fn get_debt(
        &self,
        market: &Address,
        user: &Address,
    ) -> Result<FixedPoint, DataSourceError> {
        let market = to_evm_address(market)?;
        let user = to_evm_address(user)?;
        let debt = ICToken::new(market, self.provider.clone())
            .borrowBalanceCurrent(user)
            .call()
            .await
            .map_err(map_contract_error)?;
        let decimals = self.underlying_decimals(market).await?;
        Ok(u256_to_fixed(debt, decimals))
    }
}

fn to_evm_address(addr: &Address) -> Result<EvmAddress, DataSourceError> {
    addr.as_str()
        .parse::<EvmAddress>()
        .map_err(|e| DataSourceError::Other(format!("Invalid address {}: {}", addr, e)))
}

fn u256_to_fixed(value: U256, decimals: u32) -> FixedPoint {
    FixedPoint::new(
        BigInt::from_bytes_be(Sign::Plus, &value.to_be_bytes::<32>()),
        decimals,
    )
}

fn decode_mint(log: &Log) -> Result<MintEvent, DataSourceError> {
    let decoded = log
        .log_decode::<ICToken::Mint>()
        .map_err(|e| DataSourceError::ParseError(format!("Invalid Mint log: {}", e)))?;
    let mint = decoded.inner.data;

    let block_number = log
        .block_number
        .ok_or_else(|| DataSourceError::ParseError("Missing block number".to_string()))?;
    let log_index = log
        .log_index
        .ok_or_else(|| DataSourceError::ParseError("Missing log index".to_string()))?;

    Ok(MintEvent::new(
        Address::new(mint.minter.to_checksum(None)),
        u256_to_fixed(mint.mintAmount, MINT_AMOUNT_DECIMALS),
        block_number,
        log_index,
    ))
}

fn map_transport_error(err: TransportError) -> DataSourceError {
    match err {
        RpcError::ErrorResp(payload) if payload.code == 429 => DataSourceError::RateLimited,
        RpcError::ErrorResp(payload) => {
            DataSourceError::Other(format!("RPC error {}: {}", payload.code, payload.message))
        }
        RpcError::Transport(TransportErrorKind::HttpError(http)) if http.status == 429 => {
            DataSourceError::RateLimited
        }
        RpcError::Transport(TransportErrorKind::HttpError(http)) => DataSourceError::HttpError {
            status: http.status,
            message: http.body,
        },
        RpcError::Transport(kind) => DataSourceError::NetworkError(kind.to_string()),
        other => DataSourceError::ParseError(other.to_string()),
    }
}

fn map_contract_error(err: alloy::contract::Error) -> DataSourceError {
    match err {
        alloy::contract::Error::TransportError(e) => map_transport_error(e),
        other => DataSourceError::ParseError(other.to_string()),
    }
}
