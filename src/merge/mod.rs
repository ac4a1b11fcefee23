//! Parameter merging.
//!
//! # Data Flow
//! ```text
//! path captures + query string
//!     → flatten.rs (FlatParams: ordered key → values, query overrides path)
//!
//! Argument::default() serialized to a JSON skeleton
//!     → apply.rs overlay (decoded body, deep object merge)
//!     → apply.rs merge (FlatParams, field resolution by naming convention)
//!     → lenient.rs (string → typed coercion while deserializing)
//!     → typed argument
//! ```
//!
//! # Design Decisions
//! - The default value of the argument type is the schema for field name
//!   resolution; keys it does not know are passed through verbatim and the
//!   argument type's own deserialization ignores or rejects them
//! - Field resolution order: exact key, snake_case, lowerCamelCase, then a
//!   case-insensitive scan
//! - List fields receive appended elements; merging the same key twice is
//!   not idempotent
//! - Scalar fields coerce eagerly so bad input is rejected before invocation

pub mod apply;
pub mod fill;
pub mod flatten;
pub mod lenient;

use thiserror::Error;

pub use apply::{merge, overlay};
pub use fill::{fill_request, FillOptions};
pub use flatten::{collect, FlatParams};
pub use lenient::{from_value, Lenient};

/// Error produced while merging parameters into an argument.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("field {path:?} is not an object")]
    NotAnObject { path: String },

    #[error("cannot assign {value:?} to field {path:?}: expected {expected}")]
    Coerce {
        path: String,
        value: String,
        expected: &'static str,
    },

    #[error("field {path:?} cannot be set from a parameter")]
    Unsupported { path: String },

    #[error("argument conversion failed: {0}")]
    Convert(#[from] serde_json::Error),
}

/// Naming convention tried when a parameter key does not match a field
/// exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldNaming {
    /// `user_id`
    SnakeCase,
    /// `userId`
    LowerCamelCase,
}

/// Knobs for [`merge`].
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Append to list fields instead of replacing them.
    pub append_lists: bool,
    /// Conventions tried in order after an exact match fails.
    pub naming: Vec<FieldNaming>,
    /// Fall back to a case-insensitive field scan.
    pub case_insensitive: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            append_lists: true,
            naming: vec![FieldNaming::SnakeCase, FieldNaming::LowerCamelCase],
            case_insensitive: true,
        }
    }
}
