//! Inbound request interpretation.
//!
//! # Responsibilities
//! - Decode the resolve query parameters, including legacy spellings
//! - Attribute a request to a client address behind proxies
//!
//! # Design Decisions
//! - `identifier` wins over the legacy `username`/`mail` spellings, which
//!   are kept so existing callers do not break
//! - Only the first `X-Forwarded-For` hop is used for attribution

use std::net::SocketAddr;

use axum::http::HeaderMap;
use serde::Deserialize;

/// Query parameters accepted by the resolve endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResolveParams {
    pub identifier: Option<String>,
    pub username: Option<String>,
    pub mail: Option<String>,
}

impl ResolveParams {
    /// The submitted identifier, favoring the canonical parameter over the
    /// legacy spellings. Empty when nothing usable was supplied; validation
    /// downstream turns that into the proper outcome.
    pub fn identifier(&self) -> &str {
        [&self.identifier, &self.username, &self.mail]
            .into_iter()
            .flatten()
            .next()
            .map(String::as_str)
            .unwrap_or_default()
    }
}

/// Client address for logs and response attribution: the first
/// `X-Forwarded-For` hop when present, the socket peer otherwise.
pub fn client_ip(headers: &HeaderMap, peer: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .unwrap_or_else(|| peer.ip().to_string())
}
