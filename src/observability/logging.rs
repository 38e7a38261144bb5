//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once, at process start
//! - Resolve the effective filter from the environment
//!
//! # Design Decisions
//! - `RUST_LOG` always wins; the passed directive is only the fallback
//! - Initialization happens before configuration is loaded, so verbosity is
//!   a process flag rather than a config file field

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber. `default_directive` applies when
/// `RUST_LOG` is unset.
pub fn init(default_directive: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
