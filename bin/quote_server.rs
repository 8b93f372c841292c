//! # Quote Server
//!
//! HTTP service comparing the multi-provider aggregator with the Curve router.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin quote_server -- --config Config.toml
//! ```
//!
//! Press Ctrl+C to stop gracefully.

use anyhow::Result;
use clap::Parser;
use log::{error, info, warn};
use quote_arbiter::curve::CURVE_CHAIN_ID;
use quote_arbiter::server::{self, AppState};
use quote_arbiter::settings::Settings;
use quote_arbiter::units::redact_url;
use tokio::net::TcpListener;
use tokio::signal;

#[derive(Parser, Debug)]
#[command(name = "quote_server", version, about = "Swap quote comparison server")]
struct Args {
    /// Settings file; missing files fall back to defaults and environment
    #[arg(long, default_value = "Config.toml")]
    config: String,
    /// Overrides `server.host`
    #[arg(long)]
    host: Option<String>,
    /// Overrides `server.port`
    #[arg(long)]
    port: Option<u16>,
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        return;
    }
    info!("Ctrl+C received, shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let mut settings = Settings::from_path(&args.config)?;
    if let Some(host) = args.host {
        settings.server.host = host;
    }
    if let Some(port) = args.port {
        settings.server.port = port;
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(settings.log.level.as_str())).init();

    let state = AppState::from_settings(&settings)?;

    if let Some(secondary) = &state.secondary {
        match settings.rpc.configured_url_for(CURVE_CHAIN_ID) {
            Some(url) => {
                info!("Initializing Curve API via {}", redact_url(&url));
                match secondary.initialize(&url).await {
                    Ok(()) => info!("Curve API initialized"),
                    Err(e) => error!("Curve initialization failed, continuing without Curve: {}", e),
                }
            }
            None => warn!("No RPC URL for Ethereum, Curve disabled"),
        }
    }

    let listener = TcpListener::bind((settings.server.host.as_str(), settings.server.port)).await?;
    server::serve(listener, state, shutdown_signal()).await
}
