//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check strategy templates against the known placeholder set
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Detect duplicate strategy names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationIssue>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::RelayConfig;
use crate::strategy::{StrategyCatalog, TemplateError};

/// One semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationIssue {
    #[error("listener.bind_address `{0}` is not a valid socket address")]
    InvalidBindAddress(String),

    #[error("upstream.base_url `{url}` is invalid: {detail}")]
    InvalidBaseUrl { url: String, detail: String },

    #[error("upstream.base_url must use http or https, got `{0}`")]
    UnsupportedScheme(String),

    #[error("upstream.attempt_timeout_secs must be greater than zero")]
    ZeroAttemptTimeout,

    #[error("listener.request_timeout_secs must be greater than zero")]
    ZeroRequestTimeout,

    #[error("strategy catalog is empty")]
    NoStrategies,

    #[error("duplicate strategy name `{0}`")]
    DuplicateStrategy(String),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("retries.max_attempts must be at least 1")]
    ZeroAttempts,

    #[error("rate_limit.requests_per_second must be greater than zero when enabled")]
    ZeroRateLimit,

    #[error("credentials token and segment lengths must be greater than zero")]
    ZeroTokenLength,
}

/// Check everything serde cannot. Collects every issue rather than stopping
/// at the first, so one reload failure log names them all.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationIssue>> {
    let mut issues = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        issues.push(ValidationIssue::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.listener.request_timeout_secs == 0 {
        issues.push(ValidationIssue::ZeroRequestTimeout);
    }

    match Url::parse(&config.upstream.base_url) {
        Ok(url) if url.scheme() != "http" && url.scheme() != "https" => {
            issues.push(ValidationIssue::UnsupportedScheme(url.scheme().to_string()));
        }
        Ok(_) => {}
        Err(err) => {
            issues.push(ValidationIssue::InvalidBaseUrl {
                url: config.upstream.base_url.clone(),
                detail: err.to_string(),
            });
        }
    }
    if config.upstream.attempt_timeout_secs == 0 {
        issues.push(ValidationIssue::ZeroAttemptTimeout);
    }

    if config.strategies.is_empty() {
        issues.push(ValidationIssue::NoStrategies);
    }
    let mut seen = HashSet::new();
    for strategy in &config.strategies {
        if !seen.insert(strategy.name.as_str()) {
            issues.push(ValidationIssue::DuplicateStrategy(strategy.name.clone()));
        }
    }
    if let Err(err) = StrategyCatalog::from_config(config) {
        issues.push(ValidationIssue::Template(err));
    }

    if config.retries.max_attempts == 0 {
        issues.push(ValidationIssue::ZeroAttempts);
    }

    if config.rate_limit.enabled && config.rate_limit.requests_per_second == 0 {
        issues.push(ValidationIssue::ZeroRateLimit);
    }

    let creds = &config.credentials;
    if creds.csrf_token_len == 0
        || creds.claim_token_len == 0
        || creds.session_segments == 0
        || creds.session_segment_len == 0
    {
        issues.push(ValidationIssue::ZeroTokenLength);
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}
