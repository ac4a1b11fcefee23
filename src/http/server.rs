//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Collect handlers, wrappers, codecs and the error handler
//! - Freeze them into a `Dispatcher`
//! - Build the Axum router with transport middleware
//! - Serve a listener until the shutdown future resolves

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, extract::State, http::Request, response::Response, Router};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::codec::{Codec, CodecRegistry};
use crate::config::{validate_config, ConfigError, ServerConfig};
use crate::dispatch::{DispatchSettings, Dispatcher, ErrorHandler, HandlerWrapper, MiddlewareChain};
use crate::endpoint::{bind, BindError, BindOptions, EndpointDescriptor, EndpointTable, Handler};
use crate::http::request::UuidRequestId;
use crate::routing::Router as RouteTrie;

/// Collects everything the dispatcher needs before serving starts.
pub struct ServerBuilder {
    config: ServerConfig,
    routes: RouteTrie<Arc<EndpointDescriptor>>,
    codecs: CodecRegistry,
    wrappers: Vec<HandlerWrapper>,
    error_handler: Option<ErrorHandler>,
}

impl ServerBuilder {
    fn new(config: ServerConfig) -> Self {
        Self {
            config,
            routes: RouteTrie::new(),
            codecs: CodecRegistry::with_defaults(),
            wrappers: Vec::new(),
            error_handler: None,
        }
    }

    /// Bind `handler`'s methods according to `table`.
    ///
    /// Malformed entries are logged and skipped; a route collision fails.
    pub fn handle<S>(mut self, handler: Handler<S>, table: &EndpointTable) -> Result<Self, BindError> {
        let options = BindOptions {
            register_rpc: self.config.dispatch.register_rpc,
        };
        let report = bind(&handler, table, &mut self.routes, options)?;
        tracing::info!(
            service = handler.name(),
            bound = report.bound.len(),
            skipped = report.skipped.len(),
            "Handler registered"
        );
        Ok(self)
    }

    /// Add a handler wrapper. The first one added runs outermost.
    pub fn wrap(mut self, wrapper: HandlerWrapper) -> Self {
        self.wrappers.push(wrapper);
        self
    }

    /// Register a codec for `content_type`.
    pub fn codec(self, content_type: &str, codec: impl Codec + 'static) -> Self {
        self.codecs.register(content_type, codec);
        self
    }

    /// Replace the default error handler.
    pub fn error_handler(mut self, handler: ErrorHandler) -> Self {
        self.error_handler = Some(handler);
        self
    }

    /// Validate the configuration and freeze the dispatcher.
    pub fn build(self) -> Result<HttpServer, ConfigError> {
        validate_config(&self.config).map_err(ConfigError::Validation)?;

        let mut dispatcher = Dispatcher::new(
            DispatchSettings::from_config(&self.config),
            self.routes,
            Arc::new(self.codecs),
            MiddlewareChain::new(self.wrappers),
        );
        if let Some(handler) = self.error_handler {
            dispatcher = dispatcher.with_error_handler(handler);
        }

        Ok(HttpServer {
            config: self.config,
            dispatcher: Arc::new(dispatcher),
        })
    }
}

/// HTTP front end of the dispatcher.
pub struct HttpServer {
    config: ServerConfig,
    dispatcher: Arc<Dispatcher>,
}

impl HttpServer {
    pub fn builder(config: ServerConfig) -> ServerBuilder {
        ServerBuilder::new(config)
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Axum router feeding every request to the dispatcher.
    pub fn router(&self) -> Router {
        build_router(&self.config, Arc::clone(&self.dispatcher))
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.dispatcher.routes().len(),
            "HTTP server starting"
        );

        let app = self.router().into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
fn build_router(config: &ServerConfig, dispatcher: Arc<Dispatcher>) -> Router {
    let mut router = Router::new()
        .fallback(dispatch_handler)
        .with_state(dispatcher);

    if config.timeouts.request_secs > 0 {
        router = router.layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)));
    }

    router
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
        .layer(TraceLayer::new_for_http())
}

async fn dispatch_handler(State(dispatcher): State<Arc<Dispatcher>>, request: Request<Body>) -> Response {
    dispatcher.dispatch(request).await
}
