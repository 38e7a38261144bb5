//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (per-client token bucket)
//!     → Pass to the resolve pipeline
//! ```
//!
//! # Design Decisions
//! - Fail closed: a client over its budget is rejected before any work
//! - Client throttling is tagged `"scope": "client"` so callers can tell it
//!   apart from upstream throttling
//! - No trust in client input

pub mod rate_limit;
