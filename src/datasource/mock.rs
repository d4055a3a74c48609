//! Mock data source for testing without network calls.

use super::{DataSourceError, LedgerSource, MarketSource, PriceSource};
use crate::domain::{Address, BlockRange, FixedPoint, Market, MintEvent};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_MAX_BLOCK_RANGE: u64 = 1000;

/// Mock data source that returns predefined test data.
///
/// Clones share their call counters, so a clone handed to a scanner can be
/// inspected through the original.
#[derive(Debug, Clone)]
pub struct MockDataSource {
    events: Vec<MintEvent>,
    max_block_range: u64,
    latest_block: Option<u64>,
    failing_blocks: Vec<u64>,
    latency: Option<fn(BlockRange) -> Duration>,
    transient_failures: Arc<AtomicUsize>,
    markets: HashMap<String, Market>,
    balances: HashMap<(String, String), FixedPoint>,
    exchange_rates: HashMap<String, FixedPoint>,
    debts: HashMap<(String, String), FixedPoint>,
    usd_per_eth: Option<FixedPoint>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
    fetch_calls: Arc<AtomicUsize>,
}

fn key(addr: &Address) -> String {
    addr.as_str().to_lowercase()
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockDataSource {
    /// Create a new mock data source with empty data.
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            max_block_range: DEFAULT_MAX_BLOCK_RANGE,
            latest_block: Some(0),
            failing_blocks: Vec::new(),
            latency: None,
            transient_failures: Arc::new(AtomicUsize::new(0)),
            markets: HashMap::new(),
            balances: HashMap::new(),
            exchange_rates: HashMap::new(),
            debts: HashMap::new(),
            usd_per_eth: None,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
            fetch_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Add a mint event to the mock ledger.
    pub fn with_mint_event(mut self, event: MintEvent) -> Self {
        self.events.push(event);
        self
    }

    /// Add multiple mint events to the mock ledger.
    pub fn with_mint_events(mut self, events: Vec<MintEvent>) -> Self {
        self.events.extend(events);
        self
    }

    /// Set the widest range a single fetch accepts.
    pub fn with_max_block_range(mut self, max: u64) -> Self {
        self.max_block_range = max;
        self
    }

    /// Report `block` as the chain head.
    pub fn with_latest_block(mut self, block: u64) -> Self {
        self.latest_block = Some(block);
        self
    }

    /// Fail every chain head query, as an unreachable node would.
    pub fn with_unreachable_head(mut self) -> Self {
        self.latest_block = None;
        self
    }

    /// Fail every fetch whose range covers `block`.
    pub fn with_failing_block(mut self, block: u64) -> Self {
        self.failing_blocks.push(block);
        self
    }

    /// Fail the next `count` fetches with a transient network error.
    pub fn with_transient_failures(self, count: usize) -> Self {
        self.transient_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Delay each fetch by an amount derived from its range.
    pub fn with_latency(mut self, latency: fn(BlockRange) -> Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn with_market(
        mut self,
        market: &Address,
        is_listed: bool,
        collateral_factor: FixedPoint,
    ) -> Self {
        self.markets.insert(
            key(market),
            Market {
                is_listed,
                collateral_factor,
            },
        );
        self
    }

    pub fn with_balance(mut self, market: &Address, user: &Address, balance: FixedPoint) -> Self {
        self.balances.insert((key(market), key(user)), balance);
        self
    }

    pub fn with_exchange_rate(mut self, market: &Address, rate: FixedPoint) -> Self {
        self.exchange_rates.insert(key(market), rate);
        self
    }

    pub fn with_debt(mut self, market: &Address, user: &Address, debt: FixedPoint) -> Self {
        self.debts.insert((key(market), key(user)), debt);
        self
    }

    /// Set the value returned by usd_per_eth.
    pub fn with_usd_per_eth(mut self, price: FixedPoint) -> Self {
        self.usd_per_eth = Some(price);
        self
    }

    /// Highest number of concurrent `fetch_mint_events` calls observed.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Total number of `fetch_mint_events` calls, including failed ones.
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockDataSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerSource for MockDataSource {
    fn max_block_range(&self) -> u64 {
        self.max_block_range
    }

    async fn latest_block(&self) -> Result<u64, DataSourceError> {
        self.latest_block
            .ok_or_else(|| DataSourceError::NetworkError("connection refused".to_string()))
    }

    async fn fetch_mint_events(
        &self,
        range: BlockRange,
    ) -> Result<Vec<MintEvent>, DataSourceError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlightGuard(&self.in_flight);
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency(range)).await;
        }

        if range.width() > self.max_block_range {
            return Err(DataSourceError::RangeTooWide {
                requested: range.width(),
                max: self.max_block_range,
            });
        }

        let consumed = self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if consumed.is_ok() {
            return Err(DataSourceError::NetworkError("connection reset".to_string()));
        }

        if self.failing_blocks.iter().any(|b| range.contains(*b)) {
            return Err(DataSourceError::HttpError {
                status: 503,
                message: format!("range {} unavailable", range),
            });
        }

        Ok(self
            .events
            .iter()
            .filter(|e| range.contains(e.block_number))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl MarketSource for MockDataSource {
    async fn get_balance(
        &self,
        market: &Address,
        user: &Address,
    ) -> Result<FixedPoint, DataSourceError> {
        Ok(self
            .balances
            .get(&(key(market), key(user)))
            .cloned()
            .unwrap_or_else(|| FixedPoint::zero(8)))
    }

    async fn get_exchange_rate(&self, market: &Address) -> Result<FixedPoint, DataSourceError> {
        self.exchange_rates
            .get(&key(market))
            .cloned()
            .ok_or_else(|| DataSourceError::Other(format!("no exchange rate for {}", market)))
    }

    async fn get_market(&self, market: &Address) -> Result<Market, DataSourceError> {
        // Unknown markets read as unlisted, as the Comptroller reports them.
        Ok(self.markets.get(&key(market)).cloned().unwrap_or(Market {
            is_listed: false,
            collateral_factor: FixedPoint::zero(18),
        }))
    }

    async fn get_debt(
        &self,
        market: &Address,
        user: &Address,
    ) -> Result<FixedPoint, DataSourceError> {
        Ok(self
            .debts
            .get(&(key(market), key(user)))
            .cloned()
            .unwrap_or_else(|| FixedPoint::zero(18)))
    }
}

#[async_trait]
impl PriceSource for MockDataSource {
    async fn usd_per_eth(&self) -> Result<FixedPoint, DataSourceError> {
        self.usd_per_eth
            .clone()
            .ok_or_else(|| DataSourceError::Other("no price configured".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MINT_AMOUNT_DECIMALS;
    use std::str::FromStr;

    fn addr(s: &str) -> Address {
        Address::from_str(s).unwrap()
    }

    fn mint(block: u64, log: u64, wei: u64) -> MintEvent {
        MintEvent::new(
            addr("0x1111111111111111111111111111111111111111"),
            FixedPoint::new(wei, MINT_AMOUNT_DECIMALS),
            block,
            log,
        )
    }

    #[tokio::test]
    async fn test_mock_fetch_filters_by_half_open_range() {
        let mock = MockDataSource::new().with_mint_events(vec![
            mint(10, 0, 1),
            mint(19, 0, 2),
            mint(20, 0, 3),
        ]);
        let events = mock
            .fetch_mint_events(BlockRange::new(10, 20).unwrap())
            .await
            .unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.block_number < 20));
        assert_eq!(mock.fetch_calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_rejects_wide_range() {
        let mock = MockDataSource::new().with_max_block_range(10);
        let result = mock.fetch_mint_events(BlockRange::new(0, 11).unwrap()).await;
        assert_eq!(
            result,
            Err(DataSourceError::RangeTooWide {
                requested: 11,
                max: 10
            })
        );
    }

    #[tokio::test]
    async fn test_mock_transient_failures_are_consumed() {
        let mock = MockDataSource::new().with_transient_failures(1);
        let range = BlockRange::new(0, 5).unwrap();
        tokio_test::assert_err!(mock.fetch_mint_events(range).await);
        tokio_test::assert_ok!(mock.fetch_mint_events(range).await);
    }

    #[tokio::test]
    async fn test_mock_failing_block() {
        let mock = MockDataSource::new().with_failing_block(42);
        assert!(mock.fetch_mint_events(BlockRange::new(40, 50).unwrap()).await.is_err());
        assert!(mock.fetch_mint_events(BlockRange::new(43, 50).unwrap()).await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_market_lookup_is_case_insensitive() {
        let market = addr("0x4Ddc2D193948926D02f9B1fE9e1daa0718270ED5");
        let mock = MockDataSource::new().with_market(
            &market,
            true,
            FixedPoint::from_str("0.75").unwrap(),
        );
        let lower = addr("0x4ddc2d193948926d02f9b1fe9e1daa0718270ed5");
        let found = mock.get_market(&lower).await.unwrap();
        assert!(found.is_listed);

        let unknown = mock
            .get_market(&addr("0x0000000000000000000000000000000000000001"))
            .await
            .unwrap();
        assert!(!unknown.is_listed);
    }

    #[tokio::test]
    async fn test_mock_latest_block() {
        let mock = MockDataSource::new().with_latest_block(8_710_758);
        assert_eq!(mock.latest_block().await, Ok(8_710_758));

        let mock = mock.with_unreachable_head();
        assert!(mock.latest_block().await.unwrap_err().is_transient());
    }

    #[tokio::test]
    async fn test_mock_price() {
        let price = FixedPoint::from_str("3456.78").unwrap();
        let mock = MockDataSource::new().with_usd_per_eth(price.clone());
        assert_eq!(mock.usd_per_eth().await.unwrap(), price);
        assert!(MockDataSource::new().usd_per_eth().await.is_err());
    }
}
