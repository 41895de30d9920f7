//! Thermo Service - Telemetry collector, HTTP API and WebSocket feed.
//!
//! Run with: `cargo run -p thermo-service -- --mock`

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use thermo_service::{AppState, Config, SourceMode, app, start_collector};

/// Thermo Service - Telemetry collector, HTTP API and WebSocket feed.
#[derive(Parser, Debug)]
#[command(name = "thermo-service")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address (overrides config).
    #[arg(short, long)]
    bind: Option<String>,

    /// Use the synthetic generator instead of a measuring process.
    #[arg(long, conflicts_with = "command")]
    mock: bool,

    /// Measuring command to run (implies process mode).
    #[arg(long)]
    command: Option<String>,

    /// Disable background collector (API only mode).
    #[arg(long)]
    no_collector: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("thermo_service=info".parse()?)
                .add_directive("thermo_core=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default().unwrap_or_default(),
    };

    // Override config with CLI args
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if args.mock {
        config.source.mode = SourceMode::Mock;
    }
    if let Some(command) = args.command {
        config.source.mode = SourceMode::Process;
        config.source.command = command;
    }
    config.validate()?;

    let addr: SocketAddr = config.server.bind.parse()?;
    let state = AppState::new(config);

    // Start the background collector; a source failure leaves the API up
    let collector = if args.no_collector {
        info!("Background collector disabled");
        None
    } else {
        start_collector(Arc::clone(&state))
    };

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(Arc::clone(&state)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down");
    state.collector.signal_stop();
    if let Some(handle) = collector {
        let _ = handle.await;
    }

    Ok(())
}

/// Resolve on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
