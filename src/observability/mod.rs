//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher (per matched endpoint, unless skipped):
//!     → tracing.rs (server span "<Service.Method> rpc-server", status on close)
//!     → metrics.rs (request totals, in-flight gauge, latency histograms)
//!
//! Binary startup:
//!     → logging.rs (tracing-subscriber registry, env filter, fmt layer)
//! ```
//!
//! # Design Decisions
//! - The library only emits through the `tracing` and `metrics` facades;
//!   installing subscribers and exporters is the embedding program's job
//! - Endpoints on the skip list get neither a span nor metrics
//! - Metrics are cheap (atomic increments in whatever recorder is installed)

pub mod logging;
pub mod metrics;
pub mod tracing;
