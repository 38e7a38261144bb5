//! Attempt-result to outcome mapping.
//!
//! # Responsibilities
//! - Map one strategy's final attempt result onto the caller-visible taxonomy
//! - Redact every contact string before it enters an outcome
//!
//! # Design Decisions
//! - Pure function of its inputs: the same result and identifier always
//!   produce the same outcome
//! - Failure text is scrubbed, not dropped; upstream reasons help callers,
//!   raw contacts do not
//! - A rate-limited result that survived the whole retry budget is terminal
//!   for the caller, so it maps to `RateLimited` rather than advancing

use crate::executor::{AttemptResult, FailureKind, TransientKind, TransportErrorKind};
use crate::identifier::Identifier;
use crate::outcome::Outcome;
use crate::redact;

/// Seconds a throttled caller is told to wait when the upstream did not say.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Classify one strategy's final attempt result. The identifier supplies the
/// contact fallback for successes and the scrub target for failure text.
pub fn classify(result: &AttemptResult, identifier: &Identifier) -> Outcome {
    match result {
        AttemptResult::Success { message } => {
            let contact = redact::extract_contact(message)
                .map(redact::redact)
                .unwrap_or_else(|| identifier.redacted());
            Outcome::Success {
                message: redact::scrub(message, identifier.as_str()),
                contact,
            }
        }

        AttemptResult::DefinitiveFailure { kind, message } => {
            let reason = redact::scrub(message, identifier.as_str());
            match kind {
                FailureKind::NotFound => Outcome::NotFound { reason },
                FailureKind::ChallengeRequired => Outcome::ChallengeRequired { reason },
            }
        }

        AttemptResult::TransientFailure {
            kind: TransientKind::RateLimited,
            retry_after_secs,
            ..
        } => Outcome::RateLimited {
            retry_after_secs: retry_after_secs.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        },

        AttemptResult::TransientFailure { status, .. } => Outcome::UpstreamError {
            status: *status,
            diagnostics: Vec::new(),
        },

        AttemptResult::TransportError {
            kind: TransportErrorKind::Timeout,
            ..
        } => Outcome::Timeout,

        AttemptResult::TransportError { .. } => Outcome::UpstreamError {
            status: None,
            diagnostics: Vec::new(),
        },
    }
}
