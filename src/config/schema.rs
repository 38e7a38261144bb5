//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::credentials::CredentialConfig;
use crate::strategy::{BodyKind, HttpMethod};

/// Root configuration for the recovery relay.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (bind address, inbound deadline).
    pub listener: ListenerConfig,

    /// Upstream recovery service: base URL, per-attempt timeout,
    /// classification markers.
    pub upstream: UpstreamConfig,

    /// Credential synthesis: token shapes and the opaque seed table.
    pub credentials: CredentialConfig,

    /// Ordered strategy catalog. File order is priority order.
    pub strategies: Vec<StrategyConfig>,

    /// Retry policy for transient attempt failures.
    pub retries: RetryConfig,

    /// Inbound per-IP rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            upstream: UpstreamConfig::default(),
            credentials: CredentialConfig::default(),
            strategies: default_strategies(),
            retries: RetryConfig::default(),
            rate_limit: RateLimitConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Wrapping deadline for one inbound request, in seconds. Bounds the
    /// whole strategy × retry loop from the outside.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 75,
        }
    }
}

/// Upstream recovery service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL strategy paths are resolved against.
    pub base_url: String,

    /// Deadline for one upstream attempt, in seconds.
    pub attempt_timeout_secs: u64,

    /// Response classification markers.
    pub markers: MarkerConfig,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://recovery.example.com".to_string(),
            attempt_timeout_secs: 15,
            markers: MarkerConfig::default(),
        }
    }
}

/// Marker strings driving response classification. Upstream error text is
/// brittle, so these are configuration rather than constants.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MarkerConfig {
    /// Accepted values of the body's `status` field on a 2xx response.
    pub ok: Vec<String>,

    /// Message substrings (lowercase) that indicate upstream throttling.
    pub rate_limited: Vec<String>,

    /// Message substrings (lowercase) that indicate an interactive
    /// verification challenge.
    pub challenge: Vec<String>,

    /// Message substrings (lowercase) that confirm no matching account.
    pub not_found: Vec<String>,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            ok: vec!["ok".to_string()],
            rate_limited: vec!["rate".to_string(), "limit".to_string()],
            challenge: vec!["challenge".to_string(), "checkpoint".to_string()],
            not_found: vec![
                "user".to_string(),
                "account".to_string(),
                "not found".to_string(),
            ],
        }
    }
}

/// One strategy entry. Templates may reference `{identifier}`, the credential
/// fields, and any key from the credentials seed table.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StrategyConfig {
    /// Strategy name for logging, metrics, and diagnostics.
    pub name: String,

    /// HTTP method.
    #[serde(default = "default_method")]
    pub method: HttpMethod,

    /// Path template, joined onto the upstream base URL. May carry a query
    /// string.
    pub path: String,

    /// Header templates, sent in addition to the body's Content-Type.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Optional body template.
    #[serde(default)]
    pub body: Option<String>,

    /// Body encoding; decides Content-Type and value escaping.
    #[serde(default = "default_body_kind")]
    pub body_kind: BodyKind,
}

fn default_method() -> HttpMethod {
    HttpMethod::Get
}

fn default_body_kind() -> BodyKind {
    BodyKind::Form
}

/// Built-in three-strategy catalog: the browser-style form endpoint, the
/// mobile lookup endpoint, and the legacy reset form.
pub fn default_strategies() -> Vec<StrategyConfig> {
    vec![
        StrategyConfig {
            name: "web-ajax".to_string(),
            method: HttpMethod::Post,
            path: "/account_recovery/ajax/".to_string(),
            headers: header_map(&[
                ("X-CSRFToken", "{csrf_token}"),
                ("X-Requested-With", "XMLHttpRequest"),
                ("X-Ajax-Id", "{ajax_id}"),
                ("Cookie", "csrftoken={csrf_token}; sessionid={session_id}"),
            ]),
            body: Some("email_or_username={identifier}&flow=recovery".to_string()),
            body_kind: BodyKind::Form,
        },
        StrategyConfig {
            name: "mobile-lookup".to_string(),
            method: HttpMethod::Get,
            path: "/api/v1/users/lookup/?q={identifier}&device_id={device_id}".to_string(),
            headers: header_map(&[
                ("X-Claim-Token", "{claim_token}"),
                ("X-Device-Id", "{device_id}"),
            ]),
            body: None,
            body_kind: BodyKind::Form,
        },
        StrategyConfig {
            name: "legacy-form".to_string(),
            method: HttpMethod::Post,
            path: "/password/reset/?username={identifier}".to_string(),
            headers: header_map(&[("X-CSRFToken", "{csrf_token}")]),
            body: Some(r#"{"username": "{identifier}", "ajax_id": "{ajax_id}"}"#.to_string()),
            body_kind: BodyKind::Json,
        },
    ]
}

fn header_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Retry configuration for one strategy's attempt loop.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum attempts per strategy, including the first.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Upper bound of the uniform random jitter added to each delay, in
    /// milliseconds.
    pub jitter_ms: u64,

    /// Synthesize fresh credentials before each retry. Stale session tokens
    /// are a known failure cause, so this defaults on.
    pub refresh_credentials: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            jitter_ms: 1000,
            refresh_credentials: true,
        }
    }
}

/// Inbound rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Maximum requests per second per IP.
    pub requests_per_second: u32,

    /// Burst capacity.
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: 10,
            burst_size: 20,
        }
    }
}

/// Observability configuration. Log verbosity is a process concern
/// (`RUST_LOG` or the CLI flag), not a config file one.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
