use anyhow::Context;
use clap::{Parser, Subcommand};
use lendscan::api;
use lendscan::api::liquidation::PRICE_DISPLAY_PLACES;
use lendscan::config::Config;
use lendscan::datasource::{
    BinancePriceSource, CompoundRpcSource, LedgerSource, RetryingLedgerSource,
};
use lendscan::domain::{Address, BlockRange};
use lendscan::engine::LiquidationOutcome;
use lendscan::orchestration::{DepositScanner, LiquidationService};
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

/// First block of the default deposit scan window.
const DEFAULT_FROM_BLOCK: u64 = 7_710_758;
/// One past the last block of the default deposit scan window.
const DEFAULT_TO_BLOCK: u64 = 8_710_759;

#[derive(Parser)]
#[command(name = "lendscan", version, about = "Compound v2 position and deposit scanner")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Print a borrower's liquidation price
    #[command(alias = "liq")]
    LiquidationPrice {
        #[arg(long)]
        user: String,
        /// Defaults to CETH_ADDRESS
        #[arg(long)]
        collateral_market: Option<String>,
        /// Defaults to CDAI_ADDRESS
        #[arg(long)]
        debt_market: Option<String>,
    },
    /// Print the largest cETH deposit in a block range
    #[command(alias = "deposit")]
    LargestDeposit {
        #[arg(long, default_value_t = DEFAULT_FROM_BLOCK)]
        from_block: u64,
        /// Exclusive upper bound
        #[arg(long, default_value_t = DEFAULT_TO_BLOCK)]
        to_block: u64,
        #[arg(long)]
        max_chunk_width: Option<u64>,
        #[arg(long)]
        concurrency_limit: Option<usize>,
    },
}

struct Services {
    liquidation: Arc<LiquidationService>,
    scanner: Arc<DepositScanner>,
}

fn build_services(config: &Config) -> anyhow::Result<Services> {
    let rpc = CompoundRpcSource::connect(
        &config.rpc_url,
        &config.ceth_address,
        &config.comptroller_address,
        config.rpc_max_block_range,
    )
    .context("Failed to connect to RPC")?;

    let ledger: Arc<dyn LedgerSource> = match config.fetch_retry_max {
        Some(max_elapsed) => Arc::new(RetryingLedgerSource::new(rpc.clone(), max_elapsed)),
        None => Arc::new(rpc.clone()),
    };
    let prices = Arc::new(BinancePriceSource::new(config.price_api_url.clone()));

    let scanner = DepositScanner::new(ledger, prices)
        .with_failure_policy(config.failure_policy)
        .with_deadline(config.scan_timeout)
        .with_max_chunks(config.max_scan_chunks);

    Ok(Services {
        liquidation: Arc::new(LiquidationService::new(Arc::new(rpc))),
        scanner: Arc::new(scanner),
    })
}

fn parse_address(raw: Option<&str>, default: &Address) -> anyhow::Result<Address> {
    match raw {
        Some(raw) => Ok(Address::from_str(raw)?),
        None => Ok(default.clone()),
    }
}

async fn serve(config: Config, services: Services) -> anyhow::Result<()> {
    let port = config.port;
    let app = api::create_router(api::AppState::new(
        config,
        services.liquidation,
        services.scanner,
    ));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::from_env().context("Configuration error")?;
    let services = build_services(&config)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, services).await,
        Command::LiquidationPrice {
            user,
            collateral_market,
            debt_market,
        } => {
            let user = Address::from_str(&user)?;
            let collateral_market =
                parse_address(collateral_market.as_deref(), &config.ceth_address)?;
            let debt_market = parse_address(debt_market.as_deref(), &config.cdai_address)?;

            let outcome = services
                .liquidation
                .compute_liquidation_price(&user, &collateral_market, &debt_market)
                .await?;
            match outcome {
                LiquidationOutcome::Price { price } => println!(
                    "Liquidation price: {}",
                    price.to_display_string(PRICE_DISPLAY_PLACES)
                ),
                LiquidationOutcome::NoDebt => {
                    println!("Liquidation price undefined: {} has no debt", user)
                }
            }
            Ok(())
        }
        Command::LargestDeposit {
            from_block,
            to_block,
            max_chunk_width,
            concurrency_limit,
        } => {
            let range = BlockRange::new(from_block, to_block)?;
            let result = services
                .scanner
                .find_largest_deposit(
                    range,
                    max_chunk_width.unwrap_or(config.max_chunk_width),
                    concurrency_limit.unwrap_or(config.concurrency_limit),
                )
                .await?;

            let record = &result.record;
            match (&record.depositor, record.block_number, record.log_index) {
                (Some(depositor), Some(block), Some(log)) => println!(
                    "Largest deposit in {}: {} ETH (${}) by {} at block {}, log {}",
                    range,
                    record.amount,
                    result.amount_usd.to_display_string(2),
                    depositor,
                    block,
                    log
                ),
                _ => println!("No deposits in {}", range),
            }
            for failed in &result.failed_chunks {
                println!("Not scanned: {} ({})", failed.chunk, failed.cause);
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}
