//! Endpoint binding.
//!
//! # Data Flow
//! ```text
//! Handler::new(receiver).method("Get", Items::get)...
//!     → descriptor.rs (typed method erased behind `Invoke`)
//!
//! Endpoint table {"Items.Get" → {Path, Method}}
//!     → binder.rs (method lookup by name suffix, pattern compile, verb parse)
//!     → Router insert under path + verb
//!     → optional POST /Service.Method alias
//! ```
//!
//! # Design Decisions
//! - Methods are registered explicitly with their argument and reply
//!   types; nothing is discovered at runtime
//! - A malformed endpoint is logged and skipped, a route collision aborts
//!   startup
//! - Descriptors are immutable and shared between the primary route and
//!   its alias

pub mod binder;
pub mod descriptor;

pub use binder::{bind, BindError, BindOptions, BindReport, EndpointMeta, EndpointTable};
pub use descriptor::{Argument, EndpointDescriptor, Handler, Invoke, MethodFn};
