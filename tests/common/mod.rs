//! Shared utilities for integration testing.

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use recovery_relay::config::RelayConfig;
use recovery_relay::http::HttpServer;
use recovery_relay::lifecycle::Shutdown;

/// A running relay bound to an ephemeral port.
pub struct RelayHandle {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub config_tx: mpsc::UnboundedSender<RelayConfig>,
}

impl RelayHandle {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start the relay on an ephemeral port and return the handles tests use to
/// talk to it and tear it down.
pub async fn spawn_relay(config: RelayConfig) -> RelayHandle {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (config_tx, config_updates) = mpsc::unbounded_channel();
    let server = HttpServer::new(config).unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    RelayHandle {
        addr,
        shutdown,
        config_tx,
    }
}

/// Relay config pointing at `upstream`, tuned so failing paths do not sit
/// in backoff sleeps. The client limiter is off; the test that covers it
/// switches it back on.
pub fn relay_config(upstream: &str) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.upstream.base_url = upstream.to_string();
    config.retries.max_attempts = 2;
    config.retries.base_delay_ms = 10;
    config.retries.max_delay_ms = 20;
    config.retries.jitter_ms = 0;
    config.rate_limit.enabled = false;
    config
}

/// Non-pooled client so requests cannot reuse a connection into a relay
/// that another test already shut down.
pub fn test_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
