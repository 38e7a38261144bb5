//! Caller-visible outcome taxonomy.

use serde::Serialize;

/// One strategy's last failure reason, reported when every strategy was
/// exhausted. Kept as an ordered list so catalog order survives
/// serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategyDiagnostic {
    /// Strategy name as configured.
    pub strategy: String,
    /// Human-readable reason for the last failed attempt.
    pub reason: String,
}

/// Final classification of one `resolve()` call.
///
/// Serialized as `{ "outcome": "<tag>", ...fields }`. Any contact string
/// carried here has already been redacted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// Upstream confirmed a recovery flow was started.
    Success {
        /// Upstream's human-readable confirmation, scrubbed of raw contacts.
        message: String,
        /// The masked contact the recovery notice was sent to.
        contact: String,
    },

    /// Upstream confirmed no matching account exists.
    NotFound { reason: String },

    /// Upstream is throttling; the caller must wait and re-invoke.
    RateLimited { retry_after_secs: u64 },

    /// Upstream demands interactive verification this system cannot perform.
    ChallengeRequired { reason: String },

    /// Unclassified upstream failure after retries and strategies were
    /// exhausted.
    UpstreamError {
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<u16>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        diagnostics: Vec<StrategyDiagnostic>,
    },

    /// A network deadline was exceeded on the final attempt.
    Timeout,

    /// Unexpected internal fault (e.g. a malformed strategy template).
    InternalError { message: String },

    /// The identifier was rejected before any network attempt.
    ValidationError { message: String },
}

impl Outcome {
    /// Whether this outcome stops strategy iteration. Only unclassified
    /// upstream errors and timeouts justify trying a different strategy.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Outcome::UpstreamError { .. } | Outcome::Timeout)
    }

    /// Stable tag for logs and metrics labels.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success { .. } => "success",
            Outcome::NotFound { .. } => "not_found",
            Outcome::RateLimited { .. } => "rate_limited",
            Outcome::ChallengeRequired { .. } => "challenge_required",
            Outcome::UpstreamError { .. } => "upstream_error",
            Outcome::Timeout => "timeout",
            Outcome::InternalError { .. } => "internal_error",
            Outcome::ValidationError { .. } => "validation_error",
        }
    }
}
