//! Deadline enforcement for upstream calls.
//!
//! # Responsibilities
//! - Bound any future with a hard per-attempt deadline
//! - Make deadline expiry a distinct, typed error
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - The deadline caps the whole exchange (connect, send, read), not
//!   individual phases

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// Expired deadline. Carries the limit so logs can say how long was allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("deadline of {limit:?} exceeded")]
pub struct DeadlineExceeded {
    pub limit: Duration,
}

/// A reusable per-attempt time limit.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    limit: Duration,
}

impl Deadline {
    pub fn new(limit: Duration) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    /// Run `future` to completion or cut it off at the limit.
    pub async fn bound<F>(&self, future: F) -> Result<F::Output, DeadlineExceeded>
    where
        F: Future,
    {
        tokio::time::timeout(self.limit, future)
            .await
            .map_err(|_| DeadlineExceeded { limit: self.limit })
    }
}
