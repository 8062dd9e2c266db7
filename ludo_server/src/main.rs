//! Ludo match server using the async actor model.
//!
//! Each match is owned by a MatchActor managed by MatchManager; the HTTP
//! and WebSocket API forwards player commands to the actors.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Error;
use log::info;
use ludo::{MatchManager, Roster};
use ludo_server::{api, config::ServerConfig, logging, metrics};
use pico_args::Arguments;

const HELP: &str = "\
Run a Ludo match server

USAGE:
  ludo_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:6969]
  --matches    N           Number of matches to create [default: env INITIAL_MATCHES or 1]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  METRICS_BIND             Prometheus exporter address; metrics are off when unset
  MATCH_INBOX_CAPACITY     Commands buffered per match actor  [default: 100]
  MATCH_EVENT_CAPACITY     Events buffered per subscriber     [default: 32]
  MATCH_RNG_SEED           Seed for reproducible dice
  MAX_MATCHES              Live match limit                   [default: 1000]
  INITIAL_MATCHES          Matches created on startup         [default: 1]
  RUST_LOG                 Log filter (e.g., info,ludo=debug)
";

struct Args {
    bind: Option<SocketAddr>,
    matches: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        return Ok(());
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        matches: pargs.opt_value_from_str("--matches")?,
    };

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.matches)?;
    config.validate()?;

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(anyhow::Error::msg)?;
        info!("Prometheus metrics exported at http://{}/metrics", addr);
    }

    info!("Starting Ludo match server at {}", config.bind);

    let match_manager = Arc::new(MatchManager::new(config.session.clone())?);

    info!("Creating {} initial match(es)...", config.initial_matches);
    for i in 0..config.initial_matches {
        match match_manager.create_match(Roster::default()).await {
            Ok(match_id) => {
                metrics::matches_created_total(false);
                info!("Created match {} with ID {}", i + 1, match_id);
            }
            Err(e) => {
                log::error!("Failed to create match {}: {}", i + 1, e);
            }
        }
    }

    let active_count = match_manager.match_count().await;
    metrics::active_matches(active_count);
    info!("Server ready with {} live match(es)", active_count);

    let app = api::create_router(api::AppState::new(match_manager));

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
