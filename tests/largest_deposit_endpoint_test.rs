use axum::http::StatusCode;
use lendscan::api;
use lendscan::config::Config;
use lendscan::datasource::MockDataSource;
use lendscan::domain::{Address, FixedPoint, MintEvent, MINT_AMOUNT_DECIMALS};
use lendscan::engine::FailurePolicy;
use lendscan::orchestration::{DepositScanner, LiquidationService};
use std::str::FromStr;
use std::sync::Arc;
use tower::util::ServiceExt;

const WHALE: &str = "0x89F4e4bE0A78a63F12bE3094d35Fb58430D10A86";

fn addr(s: &str) -> Address {
    Address::from_str(s).unwrap()
}

fn test_config() -> Config {
    Config {
        port: 0,
        rpc_url: "http://example.invalid".to_string(),
        ceth_address: addr("0x4Ddc2D193948926D02f9B1fE9e1daa0718270ED5"),
        cdai_address: addr("0x5d3a536E4D6DbD6114cc1Ead35777bAB948E3643"),
        comptroller_address: addr("0x3d9819210A31b4961b30EF54bE2aeD79B9c9Cd3B"),
        price_api_url: "http://example.invalid".to_string(),
        max_chunk_width: 1000,
        rpc_max_block_range: 1000,
        max_scan_chunks: 100_000,
        concurrency_limit: 4,
        failure_policy: FailurePolicy::FailFast,
        scan_timeout: None,
        fetch_retry_max: None,
    }
}

fn mint(depositor: &str, eth: &str, block: u64, log: u64) -> MintEvent {
    MintEvent::new(
        addr(depositor),
        FixedPoint::from_str(eth).unwrap().rescale(
            MINT_AMOUNT_DECIMALS,
            lendscan::domain::Rounding::Truncate,
        ),
        block,
        log,
    )
}

fn ledger() -> MockDataSource {
    MockDataSource::new()
        .with_mint_events(vec![
            mint("0x0000000000000000000000000000000000000001", "1.5", 7_710_800, 3),
            mint(WHALE, "400", 7_712_659, 165),
            mint("0x0000000000000000000000000000000000000002", "400", 7_713_000, 1),
            mint("0x0000000000000000000000000000000000000003", "12.25", 7_714_999, 0),
        ])
        .with_usd_per_eth(FixedPoint::from_str("231.45").unwrap())
}

fn setup_test_app(mock: MockDataSource, failure_policy: FailurePolicy) -> axum::Router {
    setup_app_with_config(mock, failure_policy, test_config())
}

fn setup_app_with_config(
    mock: MockDataSource,
    failure_policy: FailurePolicy,
    config: Config,
) -> axum::Router {
    let liquidation = Arc::new(LiquidationService::new(Arc::new(mock.clone())));
    let scanner = DepositScanner::new(Arc::new(mock.clone()), Arc::new(mock))
        .with_failure_policy(failure_policy)
        .with_max_chunks(config.max_scan_chunks);
    api::create_router(api::AppState::new(
        config,
        liquidation,
        Arc::new(scanner),
    ))
}

async fn request(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_largest_deposit_earliest_wins_tie() {
    let app = setup_test_app(ledger(), FailurePolicy::FailFast);

    let (status, body) =
        request(app, "/v1/largest-deposit?fromBlock=7710758&toBlock=7715758").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["found"], true);
    assert_eq!(body["depositor"], WHALE);
    assert_eq!(body["amount"], "400");
    assert_eq!(body["amountUsd"], "92580");
    assert_eq!(body["amountUsdDisplay"], "92580.00");
    assert_eq!(body["usdPerEth"], "231.45");
    assert_eq!(body["blockNumber"], 7_712_659);
    assert_eq!(body["logIndex"], 165);
    assert_eq!(body["chunksPlanned"], 5);
    assert_eq!(body["complete"], true);
    assert_eq!(body["failedChunks"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_chunk_width_does_not_change_result() {
    for width in [1u64, 7, 250, 1000] {
        let app = setup_test_app(ledger(), FailurePolicy::FailFast);
        let uri = format!(
            "/v1/largest-deposit?fromBlock=7710758&toBlock=7715758&maxChunkWidth={}&concurrencyLimit=3",
            width
        );

        let (status, body) = request(app, &uri).await;

        assert_eq!(status, StatusCode::OK, "width {}", width);
        assert_eq!(body["blockNumber"], 7_712_659, "width {}", width);
        assert_eq!(body["chunksPlanned"], 5000u64.div_ceil(width), "width {}", width);
    }
}

#[tokio::test]
async fn test_range_without_deposits() {
    let app = setup_test_app(ledger(), FailurePolicy::FailFast);

    let (status, body) = request(app, "/v1/largest-deposit?fromBlock=0&toBlock=2500").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["found"], false);
    assert!(body.get("depositor").is_none());
    assert_eq!(body["amount"], "0");
    assert_eq!(body["amountUsd"], "0");
    assert!(body.get("usdPerEth").is_none());
    assert_eq!(body["chunksPlanned"], 3);
}

#[tokio::test]
async fn test_to_block_is_exclusive() {
    let app = setup_test_app(ledger(), FailurePolicy::FailFast);

    let (_, body) = request(app, "/v1/largest-deposit?fromBlock=7710758&toBlock=7712659").await;
    assert_eq!(body["amount"], "1.5");

    let app = setup_test_app(ledger(), FailurePolicy::FailFast);
    let (_, body) = request(app, "/v1/largest-deposit?fromBlock=7710758&toBlock=7712660").await;
    assert_eq!(body["amount"], "400");
}

#[tokio::test]
async fn test_inverted_range_is_400() {
    let app = setup_test_app(ledger(), FailurePolicy::FailFast);

    let (status, body) = request(app, "/v1/largest-deposit?fromBlock=10&toBlock=5").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid range: start 10 is after end 5");
}

#[tokio::test]
async fn test_full_u64_range_at_width_one_is_400() {
    let app = setup_test_app(ledger(), FailurePolicy::FailFast);

    let (status, body) = request(
        app,
        "/v1/largest-deposit?fromBlock=0&toBlock=18446744073709551615&maxChunkWidth=1",
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("exceed the limit"));
}

#[tokio::test]
async fn test_configured_chunk_limit_is_400() {
    let config = Config {
        max_scan_chunks: 4,
        ..test_config()
    };
    let app = setup_app_with_config(ledger(), FailurePolicy::FailFast, config);

    let (status, body) =
        request(app, "/v1/largest-deposit?fromBlock=7710758&toBlock=7715758").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "invalid range: 5 chunks exceed the limit of 4"
    );
}

#[tokio::test]
async fn test_default_width_above_source_limit_is_400() {
    // The planning default is wider than the ledger accepts; the ledger's own
    // limit still applies.
    let config = Config {
        max_chunk_width: 1_000_000,
        ..test_config()
    };
    let mock = ledger();
    let app = setup_app_with_config(mock.clone(), FailurePolicy::FailFast, config);

    let (status, body) =
        request(app, "/v1/largest-deposit?fromBlock=7710758&toBlock=7715758").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("at most 1000"));
    assert_eq!(mock.fetch_calls(), 0);
}

#[tokio::test]
async fn test_chunk_wider_than_source_is_400() {
    let app = setup_test_app(ledger(), FailurePolicy::FailFast);

    let (status, body) = request(
        app,
        "/v1/largest-deposit?fromBlock=0&toBlock=5000&maxChunkWidth=2000",
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("at most 1000"));
}

#[tokio::test]
async fn test_fail_fast_failure_is_502() {
    let mock = ledger().with_failing_block(7_713_500);
    let app = setup_test_app(mock, FailurePolicy::FailFast);

    let (status, body) =
        request(app, "/v1/largest-deposit?fromBlock=7710758&toBlock=7715758").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("chunk #2"));
}

#[tokio::test]
async fn test_partial_failure_lists_failed_chunks() {
    let mock = ledger().with_failing_block(7_712_700);
    let app = setup_test_app(mock, FailurePolicy::Partial);

    let (status, body) =
        request(app, "/v1/largest-deposit?fromBlock=7710758&toBlock=7715758").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["complete"], false);
    let failed = body["failedChunks"].as_array().unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0]["index"], 1);
    assert_eq!(failed[0]["fromBlock"], 7_711_758);
    assert_eq!(failed[0]["toBlock"], 7_712_758);
    // The whale's chunk was lost; the tie partner in the next chunk wins.
    assert_eq!(body["blockNumber"], 7_713_000);
    assert_eq!(body["amount"], "400");
}
