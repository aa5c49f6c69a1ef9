use anyhow::Context;
use api_client::{ApiClient, BinanceClient, HttpIdentityResolver, LiveConnector};
use clap::{Parser, Subcommand};
use configuration::settings::Config;
use engine::{LiveEngine, ReconciliationPoller};
use events::{EventBus, EventRecord};
use executor::{Executor, LiveExecutor, PaperExecutor};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

/// The main entry point for the Pulse trading bot.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Secrets usually come from a .env file; it is optional.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = configuration::load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    match cli.command {
        Commands::Run => {
            let _guard = configuration::init_tracing(&config.logging)?;
            run(config).await
        }
        Commands::CheckConfig => {
            println!("Configuration OK: {}", cli.config.display());
            println!("{:#?}", config);
            Ok(())
        }
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// A single-pair momentum trading bot driven by order-book pressure.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, short, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the exchange and trade until interrupted.
    Run,
    /// Load and validate the configuration, then print it with secrets redacted.
    CheckConfig,
}

// ==============================================================================
// Run Command Logic
// ==============================================================================

async fn run(config: Config) -> anyhow::Result<()> {
    let pair = config.trading_pair()?;
    tracing::info!(%pair, live = config.trading.live_trading_enabled, "Starting Pulse.");

    let api_client: Arc<dyn ApiClient> = Arc::new(
        BinanceClient::new(&config.api, &config.network).context("Failed to build the REST client")?,
    );
    let executor: Arc<dyn Executor> = if config.trading.live_trading_enabled {
        tracing::warn!("LIVE TRADING ENABLED. Orders will be sent to the exchange.");
        Arc::new(LiveExecutor::new(api_client.clone(), pair.clone(), &config.pair))
    } else {
        tracing::info!("Paper trading: orders are logged, never sent.");
        Arc::new(PaperExecutor::new(&config.pair))
    };

    let events = EventBus::default();
    tokio::spawn(journal(events.subscribe()));

    let engine = LiveEngine::new(&config, executor, events.clone())?;
    let identity = Arc::new(
        HttpIdentityResolver::new(&config.network).context("Failed to build the identity resolver")?,
    );
    let poller = Arc::new(ReconciliationPoller::new(
        engine.state(),
        api_client,
        identity,
        pair.clone(),
        &config,
        events,
    ));

    let connector = LiveConnector::new(&config.api, &config.network)?;
    let feed = connector.subscribe_market(&pair, poller.resubscribe_signal());

    tokio::select! {
        result = engine.run(feed, poller) => result.context("Engine stopped"),
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Ctrl-C received, shutting down.");
            Ok(())
        }
    }
}

/// Writes every engine event to the log as one JSON line.
async fn journal(mut rx: broadcast::Receiver<EventRecord>) {
    loop {
        match rx.recv().await {
            Ok(record) => match record.to_json() {
                Ok(json) => tracing::debug!(target: "pulse::journal", "{}", json),
                Err(e) => tracing::warn!(error = %e, "Could not serialize engine event."),
            },
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event journal fell behind.");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
