//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! One strategy's attempt loop:
//!     retries.rs (attempt budget, credential refresh)
//!       → executor (render, send, classify)
//!       → timeouts.rs (per-attempt deadline)
//!       → On retryable result: backoff.rs (jittered exponential delay)
//! ```
//!
//! # Design Decisions
//! - Every upstream call has a deadline; there is no unbounded wait
//! - Retries follow the classified result, never the raw status alone
//! - Jittered backoff keeps repeated attempts from synchronizing

pub mod backoff;
pub mod retries;
pub mod timeouts;
