//! devlink Agent Daemon
//!
//! Runs on the controller board, keeps a WebSocket session open to the
//! coordinator, executes pin commands, and publishes telemetry.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dl_agent::gpio::SimulatedPinDriver;
use dl_agent::metrics::HostSystemInfo;
use dl_agent::Agent;
use dl_core::config::{self, AgentConfig};

#[derive(Parser)]
#[command(name = "dl-agent")]
#[command(about = "devlink agent - keeps a device connected to its coordinator")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Coordinator WebSocket URL
    /// Example: ws://hub.local:3001/raspberry-ws
    #[arg(short, long, env = "DEVLINK_ENDPOINT")]
    endpoint: Option<String>,

    /// Device ID announced in identify
    #[arg(long, env = "DEVLINK_DEVICE_ID")]
    device_id: Option<String>,

    /// Shared secret announced in identify
    #[arg(long, env = "DEVLINK_SECRET", hide_env_values = true)]
    secret: Option<String>,

    /// Run in foreground with verbose output
    #[arg(short, long)]
    foreground: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.foreground {
        "debug"
    } else {
        &args.log_level
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("devlink agent starting...");

    // Load configuration
    let config_path = args.config.clone().unwrap_or_else(config::default_config_path);

    let mut config = if config_path.exists() {
        config::load_config(&config_path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config from {:?}: {}", config_path, e);
            AgentConfig::default()
        })
    } else {
        tracing::debug!("No config at {:?}, using defaults", config_path);
        AgentConfig::default()
    };

    // Apply command-line and environment overrides
    if let Some(endpoint) = args.endpoint {
        config.endpoint = endpoint;
    }
    if let Some(device_id) = args.device_id {
        config.device_id = device_id;
    }
    if let Some(secret) = args.secret {
        config.secret = secret;
    }

    config.validate().context("Invalid agent configuration")?;

    tracing::info!("Coordinator endpoint: {}", config.endpoint);
    tracing::info!("Device ID: {}", config.device_id);

    // Create cancellation token for graceful shutdown
    let cancel = CancellationToken::new();

    // Setup signal handlers
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::warn!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                tracing::info!("Received Ctrl+C, initiating shutdown...");
            }
            _ = terminate => {
                tracing::info!("Received SIGTERM, initiating shutdown...");
            }
        }

        cancel_clone.cancel();
    });

    let agent = Agent::new(
        config,
        Arc::new(SimulatedPinDriver::new()),
        Arc::new(HostSystemInfo::new()),
    );
    agent.run(cancel).await?;

    tracing::info!("Agent shutdown complete");
    Ok(())
}
