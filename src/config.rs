use crate::domain::Address;
use crate::engine::FailurePolicy;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CETH_ADDRESS: &str = "0x4Ddc2D193948926D02f9B1fE9e1daa0718270ED5";
pub const DEFAULT_CDAI_ADDRESS: &str = "0x5d3a536E4D6DbD6114cc1Ead35777bAB948E3643";
pub const DEFAULT_COMPTROLLER_ADDRESS: &str = "0x3d9819210A31b4961b30EF54bE2aeD79B9c9Cd3B";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rpc_url: String,
    pub ceth_address: Address,
    pub cdai_address: Address,
    pub comptroller_address: Address,
    pub price_api_url: String,
    /// Default planning width for deposit scans.
    pub max_chunk_width: u64,
    /// Widest `eth_getLogs` window the RPC endpoint accepts.
    pub rpc_max_block_range: u64,
    /// Most chunks a single scan may plan.
    pub max_scan_chunks: u64,
    pub concurrency_limit: usize,
    pub failure_policy: FailurePolicy,
    pub scan_timeout: Option<Duration>,
    /// Per-fetch retry budget; `None` disables retries.
    pub fetch_retry_max: Option<Duration>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = parse_or(&env_map, "PORT", 8080u16, "must be a valid u16")?;

        let rpc_url = env_map
            .get("RPC_URL")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("RPC_URL".to_string()))?;

        let ceth_address = parse_address(&env_map, "CETH_ADDRESS", DEFAULT_CETH_ADDRESS)?;
        let cdai_address = parse_address(&env_map, "CDAI_ADDRESS", DEFAULT_CDAI_ADDRESS)?;
        let comptroller_address =
            parse_address(&env_map, "COMPTROLLER_ADDRESS", DEFAULT_COMPTROLLER_ADDRESS)?;

        let price_api_url = env_map
            .get("PRICE_API_URL")
            .cloned()
            .unwrap_or_else(|| "https://api.binance.com".to_string());

        let max_chunk_width = parse_positive(&env_map, "MAX_CHUNK_WIDTH", 1000)?;
        let rpc_max_block_range = parse_positive(&env_map, "RPC_MAX_BLOCK_RANGE", 1000)?;
        let max_scan_chunks = parse_positive(&env_map, "MAX_SCAN_CHUNKS", 100_000)?;

        let concurrency_limit =
            parse_or(&env_map, "CONCURRENCY_LIMIT", 10usize, "must be a valid usize")?;
        if concurrency_limit == 0 {
            return Err(ConfigError::InvalidValue(
                "CONCURRENCY_LIMIT".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let failure_policy = match env_map
            .get("FETCH_FAILURE_POLICY")
            .map(|s| s.as_str())
            .unwrap_or("fail_fast")
        {
            "fail_fast" => FailurePolicy::FailFast,
            "partial" => FailurePolicy::Partial,
            other => {
                return Err(ConfigError::InvalidValue(
                    "FETCH_FAILURE_POLICY".to_string(),
                    format!("must be fail_fast or partial, got {}", other),
                ))
            }
        };

        let scan_timeout = match env_map.get("SCAN_TIMEOUT_MS") {
            Some(raw) => Some(Duration::from_millis(raw.parse::<u64>().map_err(|_| {
                ConfigError::InvalidValue(
                    "SCAN_TIMEOUT_MS".to_string(),
                    "must be a valid u64".to_string(),
                )
            })?)),
            None => None,
        };

        let fetch_retry_max_ms =
            parse_or(&env_map, "FETCH_RETRY_MAX_MS", 30_000u64, "must be a valid u64")?;
        let fetch_retry_max =
            (fetch_retry_max_ms > 0).then(|| Duration::from_millis(fetch_retry_max_ms));

        Ok(Config {
            port,
            rpc_url,
            ceth_address,
            cdai_address,
            comptroller_address,
            price_api_url,
            max_chunk_width,
            rpc_max_block_range,
            max_scan_chunks,
            concurrency_limit,
            failure_policy,
            scan_timeout,
            fetch_retry_max,
        })
    }
}

fn parse_or<T: FromStr>(
    env_map: &HashMap<String, String>,
    key: &str,
    default: T,
    expectation: &str,
) -> Result<T, ConfigError> {
    match env_map.get(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(key.to_string(), expectation.to_string())),
        None => Ok(default),
    }
}

fn parse_positive(
    env_map: &HashMap<String, String>,
    key: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    let value = parse_or(env_map, key, default, "must be a valid u64")?;
    if value == 0 {
        return Err(ConfigError::InvalidValue(
            key.to_string(),
            "must be at least 1".to_string(),
        ));
    }
    Ok(value)
}

fn parse_address(
    env_map: &HashMap<String, String>,
    key: &str,
    default: &str,
) -> Result<Address, ConfigError> {
    env_map
        .get(key)
        .map(|s| s.as_str())
        .unwrap_or(default)
        .parse::<Address>()
        .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}
