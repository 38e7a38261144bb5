//! Ephemeral session credential synthesis.
//!
//! # Responsibilities
//! - Produce one self-consistent bundle of session tokens per attempt
//! - Expose configuration-supplied opaque seed values to template rendering
//!
//! # Design Decisions
//! - Tokens only need to be well-formed, not cryptographic: they satisfy
//!   upstream shape checks, nothing authenticates against them
//! - Fresh bundle per attempt; nothing is persisted or shared between calls
//! - Generation cannot fail (local randomness only)

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Shapes of the synthesized tokens plus opaque seed values for templates.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CredentialConfig {
    /// Length of the alphanumeric csrf token.
    pub csrf_token_len: usize,

    /// Length of the alphanumeric claim token (after its scheme prefix).
    pub claim_token_len: usize,

    /// Prefix prepended to the claim token.
    pub claim_prefix: String,

    /// Number of colon-separated session id segments.
    pub session_segments: usize,

    /// Length of each session id segment.
    pub session_segment_len: usize,

    /// Opaque configuration-supplied values templates may reference
    /// (e.g. an application id). Passed through untouched.
    pub seeds: HashMap<String, String>,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            csrf_token_len: 32,
            claim_token_len: 48,
            claim_prefix: "hmac.".to_string(),
            session_segments: 3,
            session_segment_len: 12,
            seeds: HashMap::new(),
        }
    }
}

/// One attempt's worth of session tokens. Created fresh, dropped with the
/// attempt.
#[derive(Debug, Clone)]
pub struct SessionCredentials {
    pub csrf_token: String,
    pub session_id: String,
    pub ajax_id: String,
    pub claim_token: String,
    pub device_id: String,
}

/// Generates `SessionCredentials` bundles from a fixed configuration.
#[derive(Debug, Clone)]
pub struct CredentialSynthesizer {
    config: CredentialConfig,
}

impl CredentialSynthesizer {
    pub fn new(config: CredentialConfig) -> Self {
        Self { config }
    }

    /// Produce a fresh credential bundle.
    pub fn synthesize(&self) -> SessionCredentials {
        let session_id = (0..self.config.session_segments)
            .map(|_| alphanumeric(self.config.session_segment_len))
            .collect::<Vec<_>>()
            .join(":");

        let epoch_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        // Seconds alone collide across rapid calls; the offset keeps ids
        // distinct without losing the timestamp shape.
        let ajax_id = epoch_secs * 1000 + fastrand::u64(..1000);

        SessionCredentials {
            csrf_token: alphanumeric(self.config.csrf_token_len),
            session_id,
            ajax_id: ajax_id.to_string(),
            claim_token: format!(
                "{}{}",
                self.config.claim_prefix,
                alphanumeric(self.config.claim_token_len)
            ),
            device_id: Uuid::new_v4().to_string().to_uppercase(),
        }
    }

    /// Configuration-supplied opaque template values.
    pub fn seeds(&self) -> &HashMap<String, String> {
        &self.config.seeds
    }
}

fn alphanumeric(len: usize) -> String {
    (0..len).map(|_| fastrand::alphanumeric()).collect()
}
