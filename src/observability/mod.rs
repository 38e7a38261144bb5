//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, env-filtered)
//!     → metrics.rs (counters and histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request IDs come from tower-http layers and flow through log spans
//! - Metric updates are cheap (atomic increments); recording with no
//!   exporter installed is a no-op, so tests need no setup
//! - Identifiers are redacted before they reach any log field

pub mod logging;
pub mod metrics;
