//! Account Recovery Relay Library

pub mod classify;
pub mod config;
pub mod credentials;
pub mod executor;
pub mod http;
pub mod identifier;
pub mod lifecycle;
pub mod observability;
pub mod orchestrator;
pub mod outcome;
pub mod redact;
pub mod resilience;
pub mod security;
pub mod strategy;

pub use config::schema::RelayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use orchestrator::Orchestrator;
pub use outcome::Outcome;
