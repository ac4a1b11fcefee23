//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at registration):
//!     path template ("/items/{id}", "/files/*path", "/v1/jobs/{id}:cancel")
//!     → pattern.rs (parse into literal / variable / wildcard segments)
//!     → trie.rs (insert per verb, reject duplicates)
//!     → Frozen trie owned by the dispatcher
//!
//! Incoming Request (verb, path)
//!     → trie.rs (segment walk, literal edges before variable edges)
//!     → Return: bound value + captured variables, or NotFound / MethodNotAllowed
//! ```
//!
//! # Design Decisions
//! - Routes compiled before serving starts, immutable at runtime
//! - No regex in hot path (segment comparison only)
//! - Deterministic: same input always matches same endpoint
//! - Longest static match wins; the walk backtracks into variable edges

pub mod pattern;
pub mod trie;

pub use pattern::{PathPattern, PatternError, Segment};
pub use trie::{Captured, Captures, InsertError, Match, RouteError, Router};
