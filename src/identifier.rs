//! Caller identifier validation.
//!
//! # Responsibilities
//! - Trim and classify the caller-supplied string (email vs username)
//! - Reject anything else before a single network attempt is made
//!
//! # Design Decisions
//! - The email pattern is deliberately loose (three-part shape only); the
//!   upstream service is the authority on whether an address exists
//! - No `Display` impl: the raw value is a contact identifier and must not
//!   drift into logs; use `redacted()` there

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::redact;

lazy_static! {
    static ref EMAIL: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
    static ref USERNAME: Regex = Regex::new(r"^[A-Za-z0-9._]{1,30}$").unwrap();
}

/// How the identifier will be presented to the upstream service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    Email,
    Username,
}

/// A validated caller identifier.
#[derive(Debug, Clone)]
pub struct Identifier {
    raw: String,
    kind: IdentifierKind,
}

/// Why an input string was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidIdentifier {
    #[error("identifier is required")]
    Empty,
    #[error(
        "identifier must be a valid email address or a username of up to \
         30 letters, digits, dots, or underscores"
    )]
    Malformed,
}

impl Identifier {
    /// Validate and classify a caller-supplied string.
    pub fn parse(input: &str) -> Result<Self, InvalidIdentifier> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(InvalidIdentifier::Empty);
        }
        let kind = if EMAIL.is_match(trimmed) {
            IdentifierKind::Email
        } else if USERNAME.is_match(trimmed) {
            IdentifierKind::Username
        } else {
            return Err(InvalidIdentifier::Malformed);
        };
        Ok(Self {
            raw: trimmed.to_string(),
            kind,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn kind(&self) -> IdentifierKind {
        self.kind
    }

    /// Masked form, safe for logs and error messages.
    pub fn redacted(&self) -> String {
        redact::redact(&self.raw)
    }
}
