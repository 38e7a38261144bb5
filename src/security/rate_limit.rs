//! Per-client rate limiting middleware.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;

use crate::config::RateLimitConfig;
use crate::http::request::client_ip;
use crate::observability::metrics;

/// A simple token bucket rate limiter.
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_update: Instant::now(),
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        // Refill tokens
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Shared limiter state. Buckets are keyed by client address and survive
/// configuration swaps; only the limits change.
pub struct RateLimiterState {
    buckets: DashMap<String, TokenBucket>,
    config: ArcSwap<RateLimitConfig>,
}

impl RateLimiterState {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            buckets: DashMap::new(),
            config: ArcSwap::from_pointee(config),
        }
    }

    /// Swap in reloaded limits.
    pub fn update(&self, config: RateLimitConfig) {
        self.config.store(Arc::new(config));
    }

    /// Whether `key` may proceed right now.
    pub fn check(&self, key: &str) -> bool {
        let config = self.config.load();
        if !config.enabled {
            return true;
        }

        let refill_rate = f64::from(config.requests_per_second);
        let capacity = f64::from(config.burst_size).max(1.0);

        let mut bucket = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(capacity));
        bucket.try_acquire(capacity, refill_rate)
    }
}

/// Middleware rejecting clients over their request budget.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiterState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = client_ip(request.headers(), peer);
    if limiter.check(&key) {
        return next.run(request).await;
    }

    tracing::warn!(client = %key, "client rate limit exceeded");
    metrics::record_rate_limited("client");

    let body = Json(serde_json::json!({
        "outcome": "rate_limited",
        "scope": "client",
        "message": "too many requests from this client",
    }));
    let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(1u64));
    response
}
