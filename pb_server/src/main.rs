//! Shared-table blackjack server using the async actor model.
//!
//! Rooms are TableActor instances managed by a TableManager; players reach
//! them through one WebSocket session each.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Error;
use log::info;
use party_blackjack::table::TableManager;
use pb_server::{
    api::{self, AppState},
    config::ServerConfig,
    logging, metrics,
};
use pico_args::Arguments;

const HELP: &str = "\
Run a shared-table blackjack server

USAGE:
  pb_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:6969]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  METRICS_BIND             Prometheus exporter address (disabled when unset)
  STARTING_CHIPS           Chips each player sits down with
  NUM_DECKS                Decks per shoe
  MAX_PLAYERS              Seats per room
  RESET_DELAY_MS           Payout display time before the next round
  RUST_LOG                 Log filter (default: info)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let bind: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;

    logging::init();

    let config = ServerConfig::from_env(bind)?;
    config.validate()?;

    if let Some(metrics_bind) = config.metrics_bind {
        metrics::init_metrics(metrics_bind).map_err(|e| anyhow::anyhow!(e))?;
        info!("Prometheus metrics at http://{}/metrics", metrics_bind);
    }

    info!(
        "Rooms: {} chips, {} deck(s), {} seats, {}ms payout display",
        config.table.starting_chips,
        config.table.num_decks,
        config.table.max_players,
        config.table.reset_delay_ms
    );
    let table_manager = Arc::new(TableManager::new(config.table.clone())?);

    let app = api::create_router(AppState { table_manager });

    info!("Starting HTTP/WebSocket server on {}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", config.bind, e))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Shutting down server...");

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
}
