//! Oracle bridge entry point.
//!
//! Bridges a live exchange ticker feed to an on-chain price oracle: one
//! qualifying ticker is encoded, signed, and reported per run.

use anyhow::Result;
use bridge_chain::{load_signer, ChainTransport, RpcClient};
use clap::Parser;
use std::sync::Arc;
use tracing::info;

/// Exchange-to-oracle price reporter
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via BRIDGE_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize TLS crypto provider (must be before any WS connections)
    bridge_feed::init_crypto();

    let args = Args::parse();

    bridge_telemetry::init_logging()?;

    info!("Starting oracle bridge v{}", env!("CARGO_PKG_VERSION"));

    // Determine config path: CLI arg > BRIDGE_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("BRIDGE_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");
    let config = bridge_reporter::AppConfig::from_file(&config_path)?;

    // The requester account asks the oracle for a price; the reporter key
    // holds the oracle account that answers.
    let requester_key = load_signer(
        &config.chain.requester.key_source()?,
        config.chain.requester.address()?,
    )?;
    let reporter_key = load_signer(
        &config.chain.reporter.key_source()?,
        config.chain.reporter.address()?,
    )?;
    info!(
        requester = %requester_key.address(),
        reporter = %reporter_key.address(),
        symbol = %config.feed.symbol,
        "Configuration loaded"
    );

    let rpc = RpcClient::connect(&config.chain.url).await?;
    let transport: Arc<dyn ChainTransport> = Arc::new(rpc);

    let app = bridge_reporter::Application::new(
        transport,
        requester_key,
        reporter_key,
        config.chain.oracle_address()?,
        config.chain.reference_hash()?,
        config.report.throttle(),
        Arc::new(bridge_core::SystemClock),
    );

    // The feed is only subscribed once the initial price request is on the
    // wire; the listener task is detached and dies with the process.
    let feed_config = config.feed.to_feed_config();
    let summary = app
        .run(move || bridge_feed::spawn_feed_listener(feed_config).updates)
        .await?;

    info!(
        price = %summary.price.value,
        ?summary.outcome.status,
        "Reporting cycle complete"
    );
    Ok(())
}
