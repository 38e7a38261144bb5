//! HTTP surface subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, rate limit)
//!     → request.rs (decode query parameters, attribute the client)
//!     → orchestrator (validate, iterate strategies, classify)
//!     → response.rs (status mapping, hints, redacted body)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use server::{HttpServer, ServerError};
