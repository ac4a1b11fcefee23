//! HTTP-to-RPC dispatch engine.
//!
//! Exposes methods of service objects as HTTP endpoints: requests are
//! matched by path template and verb, payloads are decoded through a
//! content-type selected codec, path and query parameters are merged into
//! the typed argument, and the bound method runs inside a middleware chain.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client Request
//!   ──────────────▶ http (axum + tower-http layers)
//!                        │
//!                        ▼
//!                   dispatch ──▶ routing (trie match, RPC fallback)
//!                        │
//!                        ├──▶ codec (negotiate, decode)
//!                        ├──▶ merge (body + path + query → argument)
//!                        ├──▶ middleware chain ──▶ endpoint (bound method)
//!                        └──▶ codec (encode reply / error)
//!   Client Response
//!   ◀──────────────
//!
//!   Cross-cutting: config, metadata, observability (tracing + metrics)
//! ```
//!
//! # Example
//!
//! ```ignore
//! let table = EndpointTable::from([(
//!     "Items.Get".to_string(),
//!     EndpointMeta::new("GET", "/items/{id}"),
//! )]);
//! let server = HttpServer::builder(ServerConfig::default())
//!     .handle(Handler::new(Items::default()).method("Get", Items::get), &table)?
//!     .build()?;
//! server.run(listener, shutdown).await?;
//! ```

pub mod codec;
pub mod config;
pub mod dispatch;
pub mod endpoint;
pub mod http;
pub mod merge;
pub mod metadata;
pub mod observability;
pub mod routing;

pub use config::ServerConfig;
pub use dispatch::{Context, HandlerError, RpcRequest, StatusError};
pub use endpoint::{EndpointMeta, EndpointTable, Handler};
pub use http::HttpServer;
pub use metadata::Metadata;
