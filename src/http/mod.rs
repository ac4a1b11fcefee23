//! HTTP transport subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (axum::serve, ConnectInfo<SocketAddr>)
//!     → tower-http layers (trace, request ID, timeout)
//!     → server.rs fallback handler
//!     → Dispatcher::dispatch
//!     → Response<Body>
//! ```
//!
//! # Design Decisions
//! - Every path reaches the dispatcher; routing happens in our own trie
//! - Transport concerns (timeouts, request IDs, access logs) are tower layers
//!   outside the dispatcher
//! - Callers can add their own layers on the router returned by
//!   `HttpServer::router`

pub mod request;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{HttpServer, ServerBuilder};
