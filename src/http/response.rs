//! Outcome presentation.
//!
//! # Responsibilities
//! - Map outcomes onto HTTP status codes
//! - Attach elapsed time, caller attribution, and advisory hints
//! - Shape structural responses (service index, unknown route) as JSON
//!
//! # Design Decisions
//! - The outcome's serialized form is the body; presentation only adds fields
//! - Hints are static per outcome class, never derived from upstream text
//! - Throttled responses carry `Retry-After` so well-behaved clients back off

use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use crate::outcome::Outcome;

/// HTTP status for each outcome class.
pub fn status_for(outcome: &Outcome) -> StatusCode {
    match outcome {
        Outcome::Success { .. } => StatusCode::OK,
        Outcome::NotFound { .. }
        | Outcome::ChallengeRequired { .. }
        | Outcome::ValidationError { .. } => StatusCode::BAD_REQUEST,
        Outcome::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        Outcome::Timeout => StatusCode::REQUEST_TIMEOUT,
        Outcome::UpstreamError { .. } | Outcome::InternalError { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Advisory next steps shown to callers alongside failures.
pub fn hints_for(outcome: &Outcome) -> &'static [&'static str] {
    match outcome {
        Outcome::Success { .. } => &[],
        Outcome::NotFound { .. } => &[
            "Double-check the username or email spelling.",
            "Try the email address associated with the account.",
            "The account may have been deactivated or deleted.",
        ],
        Outcome::RateLimited { .. } => &[
            "Too many requests have been made recently.",
            "Wait for the indicated time before trying again.",
        ],
        Outcome::ChallengeRequired { .. } => {
            &["Complete the verification challenge in the official app, then retry."]
        }
        Outcome::Timeout => &[
            "The upstream service did not answer in time.",
            "Try again in a few minutes.",
        ],
        Outcome::UpstreamError { .. } => &[
            "Verify the username or email is correct.",
            "Try again in a few minutes.",
            "The upstream service may be temporarily refusing requests.",
        ],
        Outcome::InternalError { .. } => &["Try again later."],
        Outcome::ValidationError { .. } => &[
            "Provide a valid email address or a username.",
            "Usernames may use up to 30 letters, digits, dots, or underscores.",
        ],
    }
}

/// Build the full HTTP response for one finished resolution.
///
/// `requested_by` is only supplied for successes; failures never echo caller
/// attribution back.
pub fn render(outcome: &Outcome, elapsed: Duration, requested_by: Option<String>) -> Response {
    let mut body = serde_json::to_value(outcome)
        .unwrap_or_else(|_| json!({ "outcome": "internal_error" }));

    if let Value::Object(map) = &mut body {
        map.insert("elapsed_ms".to_string(), json!(elapsed.as_millis() as u64));
        if let Some(client) = requested_by {
            map.insert("requested_by".to_string(), json!(client));
        }
        let hints = hints_for(outcome);
        if !hints.is_empty() {
            map.insert("hints".to_string(), json!(hints));
        }
    }

    let mut response = (status_for(outcome), Json(body)).into_response();
    if let Outcome::RateLimited { retry_after_secs } = outcome {
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(*retry_after_secs));
    }
    response
}

/// Service index served at `/`.
pub fn service_index() -> Json<Value> {
    Json(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "/resolve": "start account recovery for ?identifier=<email or username>",
            "/healthz": "liveness and uptime",
            "/": "this index",
        },
    }))
}

/// JSON 404 naming the routes that do exist.
pub fn unknown_route() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "route not found",
            "routes": ["/", "/healthz", "/resolve"],
        })),
    )
        .into_response()
}
