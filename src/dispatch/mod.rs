//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Request<Body>
//!     → dispatcher.rs INIT (incoming metadata from headers + transport)
//!     → MATCH (router, then RPC fallback via endpoint header)
//!     → NEGOTIATE (codec from Content-Type)
//!     → DECODE (body → JSON value)
//!     → MERGE (path + query parameters into the argument)
//!     → INVOKE (middleware.rs chain around the bound method)
//!     → PROPAGATE (outgoing metadata + response state → headers)
//!     → ENCODE (reply or classified error, codec re-resolved on override)
//!     → Response<Body>
//! ```
//!
//! # Design Decisions
//! - Nothing is written before the response is fully built
//! - Failures before invocation go through the error handler; failures
//!   of the handler are encoded like replies
//! - Per-request state lives in `Context`, passed by value through the
//!   chain and handed back in the `Reply`

pub mod context;
pub mod dispatcher;
pub mod error;
pub mod middleware;
pub mod request;
pub mod response;

pub use context::Context;
pub use dispatcher::{DispatchSettings, Dispatcher, TlsInfo};
pub use error::{
    default_error_handler, DispatchError, ErrorContext, ErrorHandler, HandlerError, StatusError,
};
pub use middleware::{handler_fn, wrapper, HandlerFunc, HandlerWrapper, MiddlewareChain, Reply};
pub use request::RpcRequest;
pub use response::ResponseState;
