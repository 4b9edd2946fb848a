//! Frontier lockstep host.
//!
//! Usage: `frontier_server [config.ron]`. Without a config the host plays a
//! default map for a fixed number of turns with nations and bots only.

use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use frontier_server::{ServerConfig, Session};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting Frontier lockstep host");

    let config = match std::env::args().nth(1) {
        Some(path) => match ServerConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(error = %e, "Bad config");
                std::process::exit(1);
            }
        },
        None => ServerConfig {
            max_ticks: Some(1_000),
            ..ServerConfig::default()
        },
    };
    tracing::info!(game_id = %config.game_id, interval_ms = config.turn_interval_ms, "Config loaded");

    // Transports feed this channel; none is attached to the bare host.
    let (_clients, inbox) = mpsc::channel(config.channel_capacity.max(1));
    match Session::new(config).run(inbox).await {
        Ok(summary) => {
            tracing::info!(
                ticks = summary.ticks,
                hash = summary.final_hash,
                winner = ?summary.winner,
                "Session complete"
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "Session failed");
            std::process::exit(1);
        }
    }
}
