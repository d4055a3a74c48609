use axum::http::StatusCode;
use lendscan::api::{self, AppState};
use lendscan::config::Config;
use lendscan::datasource::MockDataSource;
use lendscan::engine::FailurePolicy;
use lendscan::orchestration::{DepositScanner, LiquidationService};
use std::sync::Arc;
use tower::util::ServiceExt;

fn setup_test_app() -> axum::Router {
    setup_app_with(MockDataSource::new().with_latest_block(8_710_758))
}

fn setup_app_with(mock: MockDataSource) -> axum::Router {
    let config = Config {
        port: 0,
        rpc_url: "http://example.invalid".to_string(),
        ceth_address: "0x4Ddc2D193948926D02f9B1fE9e1daa0718270ED5".parse().unwrap(),
        cdai_address: "0x5d3a536E4D6DbD6114cc1Ead35777bAB948E3643".parse().unwrap(),
        comptroller_address: "0x3d9819210A31b4961b30EF54bE2aeD79B9c9Cd3B".parse().unwrap(),
        price_api_url: "http://example.invalid".to_string(),
        max_chunk_width: 1000,
        rpc_max_block_range: 1000,
        max_scan_chunks: 100_000,
        concurrency_limit: 4,
        failure_policy: FailurePolicy::FailFast,
        scan_timeout: None,
        fetch_retry_max: None,
    };

    let liquidation = Arc::new(LiquidationService::new(Arc::new(mock.clone())));
    let scanner = Arc::new(DepositScanner::new(
        Arc::new(mock.clone()),
        Arc::new(mock),
    ));
    api::create_router(AppState::new(config, liquidation, scanner))
}

async fn get(uri: &str) -> (StatusCode, String) {
    get_from(setup_test_app(), uri).await
}

async fn get_from(app: axum::Router, uri: &str) -> (StatusCode, String) {
    let request = axum::http::Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_health_endpoint() {
    let (status, body) = get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("ok"));
}

#[tokio::test]
async fn test_ready_endpoint() {
    let (status, body) = get("/ready").await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "ready");
    assert_eq!(json["latestBlock"], 8_710_758);
}

#[tokio::test]
async fn test_ready_is_503_when_ledger_unreachable() {
    let app = setup_app_with(MockDataSource::new().with_unreachable_head());

    let (status, body) = get_from(app, "/ready").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "unavailable");
    assert!(json["error"].as_str().unwrap().contains("connection refused"));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (status, _) = get("/v1/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_query_is_400() {
    let (status, _) = get("/v1/liquidation-price").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get("/v1/largest-deposit?fromBlock=1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
