//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (timeout, tracing, request ID, CORS, rate limit)
//! - Hold the hot-swappable engine built from configuration
//! - Apply configuration updates without dropping in-flight requests
//! - Serve until the shutdown signal fires
//!
//! # Design Decisions
//! - The orchestrator and its catalog are immutable once built; a config
//!   update builds a fresh engine and atomically swaps it in, so a request
//!   observes exactly one configuration for its whole lifetime
//! - A rejected update keeps the current engine running
//! - The transport is shared across engines; reloads do not reset
//!   connection pools

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    extract::{ConnectInfo, Query, State},
    http::{header, HeaderMap, Method},
    middleware,
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::RelayConfig;
use crate::executor::{HttpTransport, ReqwestTransport};
use crate::http::{request, response};
use crate::orchestrator::Orchestrator;
use crate::outcome::Outcome;
use crate::security::rate_limit::{rate_limit_middleware, RateLimiterState};
use crate::strategy::TemplateError;

/// Everything derived from one configuration snapshot. Swapped atomically
/// on reload.
pub struct EngineState {
    pub orchestrator: Orchestrator,
}

impl EngineState {
    fn build(
        config: RelayConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, TemplateError> {
        Ok(Self {
            orchestrator: Orchestrator::from_config(&config, transport)?,
        })
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<ArcSwap<EngineState>>,
    pub limiter: Arc<RateLimiterState>,
    pub transport: Arc<dyn HttpTransport>,
    pub started_at: Instant,
}

/// Failures while assembling the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid strategy configuration: {0}")]
    Template(#[from] TemplateError),

    #[error("failed to build http transport: {0}")]
    Transport(#[from] reqwest::Error),
}

/// HTTP server for the recovery relay.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a server backed by the production transport.
    pub fn new(config: RelayConfig) -> Result<Self, ServerError> {
        let transport = Arc::new(ReqwestTransport::new()?);
        Self::with_transport(config, transport)
    }

    /// Create a server on an arbitrary transport. Tests substitute mocks
    /// here; everything above the transport is exercised as in production.
    pub fn with_transport(
        config: RelayConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, ServerError> {
        let limiter = Arc::new(RateLimiterState::new(config.rate_limit.clone()));
        let engine = EngineState::build(config.clone(), transport.clone())?;
        let state = AppState {
            inner: Arc::new(ArcSwap::from_pointee(engine)),
            limiter,
            transport,
            started_at: Instant::now(),
        };
        let router = Self::build_router(&config, state.clone());
        Ok(Self { router, state })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &RelayConfig, state: AppState) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE]);

        Router::new()
            .route("/resolve", get(resolve_handler))
            .route("/healthz", get(health_handler))
            .route("/", get(index_handler))
            .fallback(fallback_handler)
            .with_state(state.clone())
            .layer(middleware::from_fn_with_state(
                state.limiter.clone(),
                rate_limit_middleware,
            ))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.listener.request_timeout_secs,
            )))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(cors)
    }

    /// Run the server until the shutdown signal fires. Configuration
    /// updates arriving on `config_updates` are applied to live traffic.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<RelayConfig>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let inner = self.state.inner.clone();
        let limiter = self.state.limiter.clone();
        let transport = self.state.transport.clone();
        tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                match EngineState::build(config.clone(), transport.clone()) {
                    Ok(engine) => {
                        limiter.update(config.rate_limit.clone());
                        inner.store(Arc::new(engine));
                        tracing::info!("configuration update applied");
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "configuration update rejected, keeping current");
                    }
                }
            }
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                tracing::info!("shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main resolve handler: validate, orchestrate, present.
async fn resolve_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Query(params): Query<request::ResolveParams>,
    headers: HeaderMap,
) -> Response {
    let started = Instant::now();
    let engine = state.inner.load_full();

    let outcome = engine.orchestrator.resolve(params.identifier()).await;

    let requested_by = matches!(outcome, Outcome::Success { .. })
        .then(|| request::client_ip(&headers, peer));
    response::render(&outcome, started.elapsed(), requested_by)
}

#[derive(Serialize)]
struct HealthStatus {
    status: &'static str,
    version: &'static str,
    uptime_secs: u64,
    strategies: Vec<String>,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthStatus> {
    let engine = state.inner.load_full();
    Json(HealthStatus {
        status: "operational",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.started_at.elapsed().as_secs(),
        strategies: engine
            .orchestrator
            .strategy_names()
            .into_iter()
            .map(str::to_string)
            .collect(),
    })
}

async fn index_handler() -> Json<serde_json::Value> {
    response::service_index()
}

async fn fallback_handler() -> Response {
    response::unknown_route()
}
