use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use cast_receiver::config::{self, FileConfig, ReceiverConfig, ServerConfig};
use cast_receiver::{AppState, MessageDispatcher, app_router, drive_events};

#[derive(Parser)]
#[command(name = "castr")]
#[command(about = "Demo cast receiver: sender channels drive a shared status display")]
struct Args {
    /// Path to the configuration file (default: castr.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind to (overrides configuration)
    #[arg(short = 'b', long)]
    host: Option<String>,

    /// Port for the HTTP server (overrides configuration; 0 for automatic)
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Keep serving after the last channel closes
    #[arg(long)]
    persist: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging (RUST_LOG wins over the flag-derived default)
    let default_filter = if args.debug {
        "cast_receiver=debug,tower_http=debug"
    } else {
        "cast_receiver=info,tower_http=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .init();

    let file_config: FileConfig = config::load_config(args.config.as_deref())
        .extract()
        .context("Failed to load configuration")?;

    let mut server_config = ServerConfig::from_file(&file_config.server);
    if let Some(host) = args.host {
        server_config.host = host;
    }
    if let Some(port) = args.port {
        server_config.port = port;
    }
    let receiver_config = ReceiverConfig::from_file(&file_config.receiver);

    info!("Starting {}", receiver_config.application_name);

    let (state, events_rx) = AppState::new(receiver_config);

    // The dispatcher cancels this token when the last channel closes.
    let shutdown = CancellationToken::new();
    let dispatcher = MessageDispatcher::new(
        state.registry.clone(),
        state.display.clone(),
        state.metrics.clone(),
        shutdown.clone(),
    );
    tokio::spawn(drive_events(dispatcher, events_rx));

    let app = app_router(state);

    let addr = server_config.listen_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    // Get the actual bound address (important when port was 0)
    let actual_addr = listener.local_addr()?;

    // Output port information in a machine-readable format first
    println!("RECEIVER_PORT={}", actual_addr.port());
    println!("RECEIVER_ADDR={}", actual_addr);

    info!("Receiver listening on http://{}", actual_addr);
    info!("");
    info!("Endpoints:");
    info!("  GET  /             - Status page");
    info!("  GET  /api/display  - Displayed title as JSON");
    info!("  GET  /channel      - WebSocket endpoint for senders");
    info!("  GET  /health       - Health summary");
    info!("  GET  /metrics      - Counter snapshot");

    let server = axum::serve(listener, app);

    if args.persist {
        server.await?;
    } else {
        tokio::select! {
            result = server => {
                result?;
            }
            _ = shutdown.cancelled() => {
                info!("Received shutdown signal, exiting gracefully");
            }
        }
    }

    Ok(())
}
