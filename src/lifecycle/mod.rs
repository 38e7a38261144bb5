//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Signal received → stop accepting → drain in-flight → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup lives in `main`: logging, config, listener, then serve
//! - Shutdown is a broadcast; any subsystem can wait on it

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
