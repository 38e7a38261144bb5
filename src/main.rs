//! Account Recovery Relay
//!
//! A resilient relay that turns one inbound recovery request into a series
//! of upstream attempts across interchangeable request strategies.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────────┐
//!                        │                   RECOVERY RELAY                      │
//!                        │                                                       │
//!   GET /resolve         │  ┌─────────┐    ┌────────────┐    ┌───────────────┐  │
//!   ─────────────────────┼─▶│  http   │───▶│ identifier │───▶│ orchestrator  │  │
//!                        │  │ server  │    │ validation │    │ catalog walk  │  │
//!                        │  └─────────┘    └────────────┘    └───────┬───────┘  │
//!                        │                                           │          │
//!                        │                                           ▼          │
//!                        │  ┌─────────────┐   ┌──────────┐    ┌──────────────┐  │
//!                        │  │ credential  │──▶│ strategy │───▶│  executor    │──┼──▶ upstream
//!                        │  │ synthesizer │   │ renderer │    │ + retry loop │  │    recovery
//!                        │  └─────────────┘   └──────────┘    └──────┬───────┘  │    service
//!                        │                                           │          │
//!   JSON outcome         │  ┌───────────┐    ┌────────────┐          │          │
//!   ◀────────────────────┼──│ response  │◀───│  classify  │◀─────────┘          │
//!                        │  │ + redact  │    │  taxonomy  │                     │
//!                        │  └───────────┘    └────────────┘                     │
//!                        │                                                       │
//!                        │  ┌─────────────────────────────────────────────────┐ │
//!                        │  │             Cross-Cutting Concerns               │ │
//!                        │  │  ┌────────┐ ┌─────────────┐ ┌────────────────┐  │ │
//!                        │  │  │ config │ │observability│ │ security       │  │ │
//!                        │  │  │ reload │ │ logs/metrics│ │ rate limiting  │  │ │
//!                        │  │  └────────┘ └─────────────┘ └────────────────┘  │ │
//!                        │  │  ┌─────────────────┐  ┌──────────────────────┐  │ │
//!                        │  │  │   resilience    │  │      lifecycle       │  │ │
//!                        │  │  │ timeout/backoff │  │  signals/shutdown    │  │ │
//!                        │  │  └─────────────────┘  └──────────────────────┘  │ │
//!                        │  └─────────────────────────────────────────────────┘ │
//!                        └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use recovery_relay::config::{self, ConfigWatcher};
use recovery_relay::lifecycle::{signals, Shutdown};
use recovery_relay::observability;
use recovery_relay::HttpServer;

#[derive(Parser)]
#[command(name = "recovery-relay", version, about = "Resilient account recovery relay")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address override (e.g. 127.0.0.1:8080).
    #[arg(short, long)]
    listen: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_directive = match cli.verbose {
        0 => "recovery_relay=info,tower_http=info",
        1 => "recovery_relay=debug,tower_http=debug",
        _ => "recovery_relay=trace,tower_http=debug",
    };
    observability::logging::init(default_directive);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "recovery-relay starting");

    let mut config = config::load_or_default(cli.config.as_deref())?;
    if let Some(listen) = cli.listen {
        config.listener.bind_address = listen;
    }
    if let Err(issues) = config::validate_config(&config) {
        for issue in &issues {
            tracing::error!(%issue, "invalid configuration");
        }
        return Err("configuration invalid".into());
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.base_url,
        strategies = config.strategies.len(),
        max_attempts = config.retries.max_attempts,
        "configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "listening for connections");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => observability::metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "failed to parse metrics address"
            ),
        }
    }

    // Hot reload: watch the config file when one was given. The handle (or
    // the fallback sender) must stay alive for the life of the process.
    let mut _watcher = None;
    let mut _config_tx = None;
    let config_updates = match cli.config.as_deref() {
        Some(path) if path.exists() => {
            let (watcher, updates) = ConfigWatcher::new(path);
            match watcher.run() {
                Ok(handle) => {
                    _watcher = Some(handle);
                    updates
                }
                Err(err) => {
                    tracing::warn!(error = %err, "config watcher unavailable, hot reload disabled");
                    let (tx, updates) = mpsc::unbounded_channel();
                    _config_tx = Some(tx);
                    updates
                }
            }
        }
        _ => {
            let (tx, updates) = mpsc::unbounded_channel();
            _config_tx = Some(tx);
            updates
        }
    };

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::wait_for_termination().await;
        shutdown.trigger();
    });

    let server = HttpServer::new(config)?;
    server.run(listener, config_updates, server_shutdown).await?;

    tracing::info!("shutdown complete");
    Ok(())
}
