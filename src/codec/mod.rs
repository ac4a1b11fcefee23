//! Codec subsystem.
//!
//! # Data Flow
//! ```text
//! Content-Type header ("application/json; charset=utf-8")
//!     → registry.rs (strip parameters, lower-case, table lookup)
//!     → Arc<dyn Codec>
//!     → decode: request bytes → serde_json::Value
//!     → encode: serde_json::Value → response bytes
//! ```
//!
//! # Design Decisions
//! - Codecs exchange `serde_json::Value`; typed conversion happens in the
//!   merge layer, so a codec never needs the endpoint's Rust types
//! - Table guarded by a read-write lock; lookups vastly outnumber writes
//! - Unknown content types are an explicit error, never a silent fallback

pub mod form;
pub mod json;
pub mod registry;

use serde_json::Value;
use thiserror::Error;

pub use form::FormCodec;
pub use json::JsonCodec;
pub use registry::CodecRegistry;

/// Default content type when a request does not name one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Content type of URL-encoded form bodies.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Error produced by codec lookup or conversion.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("unknown content type: {0}")]
    UnknownContentType(String),

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("encode failed: {0}")]
    Encode(String),
}

/// A stateless encode/decode strategy for one wire format.
pub trait Codec: Send + Sync + std::fmt::Debug {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Decode a request body.
    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError>;

    /// Encode a response payload.
    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError>;
}

/// Media type without parameters, lower-cased.
pub fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
