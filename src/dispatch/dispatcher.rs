//! The per-request pipeline.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::header::{CONTENT_TYPE, HOST};
use axum::http::request::Parts;
use axum::http::{HeaderName, HeaderValue, Method, Request, Response, StatusCode};
use tracing::Instrument;

use super::context::Context;
use super::error::{default_error_handler, DispatchError, ErrorContext, ErrorHandler};
use super::middleware::{MiddlewareChain, Reply};
use super::request::RpcRequest;
use crate::codec::{media_type, CodecRegistry, DEFAULT_CONTENT_TYPE, FORM_CONTENT_TYPE};
use crate::config::ServerConfig;
use crate::endpoint::{Argument, EndpointDescriptor};
use crate::merge::{self, MergeOptions};
use crate::metadata::Metadata;
use crate::observability::metrics::{self, InflightGuard};
use crate::observability::tracing as spans;
use crate::routing::{Captures, RouteError, Router};

/// TLS details a TLS-terminating transport can attach as a request
/// extension. Its presence marks the request as `https`.
#[derive(Debug, Clone, Default)]
pub struct TlsInfo {
    /// Negotiated ALPN protocol.
    pub alpn: Option<String>,
    /// SNI server name.
    pub server_name: Option<String>,
}

/// Dispatcher knobs, derived from [`ServerConfig`].
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub service_name: String,
    pub register_rpc: bool,
    pub endpoint_header: String,
    pub default_content_type: String,
    pub wrapped_error_status: StatusCode,
    pub max_body_bytes: usize,
    pub metrics_enabled: bool,
    pub tracing_enabled: bool,
    pub skip_endpoints: HashSet<String>,
}

impl DispatchSettings {
    pub fn from_config(config: &ServerConfig) -> Self {
        let dispatch = &config.dispatch;
        Self {
            service_name: config.name.clone(),
            register_rpc: dispatch.register_rpc,
            endpoint_header: dispatch.endpoint_header.clone(),
            default_content_type: dispatch.default_content_type.clone(),
            wrapped_error_status: StatusCode::from_u16(dispatch.wrapped_error_status)
                .unwrap_or(StatusCode::OK),
            max_body_bytes: dispatch.max_body_bytes,
            metrics_enabled: config.observability.metrics_enabled,
            tracing_enabled: config.observability.tracing_enabled,
            skip_endpoints: config.observability.skip_endpoints.iter().cloned().collect(),
        }
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self::from_config(&ServerConfig::default())
    }
}

/// Routes requests to bound endpoints and runs the full pipeline.
///
/// Immutable once built; shared by every connection.
pub struct Dispatcher {
    settings: DispatchSettings,
    router: Router<Arc<EndpointDescriptor>>,
    codecs: Arc<CodecRegistry>,
    chain: MiddlewareChain,
    error_handler: ErrorHandler,
    merge_options: MergeOptions,
}

impl Dispatcher {
    pub fn new(
        settings: DispatchSettings,
        router: Router<Arc<EndpointDescriptor>>,
        codecs: Arc<CodecRegistry>,
        chain: MiddlewareChain,
    ) -> Self {
        Self {
            settings,
            router,
            codecs,
            chain,
            error_handler: default_error_handler(),
            merge_options: MergeOptions::default(),
        }
    }

    /// Replace the handler for pre-invocation failures.
    pub fn with_error_handler(mut self, handler: ErrorHandler) -> Self {
        self.error_handler = handler;
        self
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    pub fn codecs(&self) -> &Arc<CodecRegistry> {
        &self.codecs
    }

    /// Registered (verb, template) pairs.
    pub fn routes(&self) -> Vec<(Method, String)> {
        self.router.routes()
    }

    /// Run one request through the pipeline.
    pub async fn dispatch(&self, request: Request<Body>) -> Response<Body> {
        let (parts, body) = request.into_parts();
        let metadata = incoming_metadata(&parts);

        let path = parts.uri.path();
        if !path.starts_with('/') {
            let err = DispatchError::InvalidPath(path.to_string());
            return self.fail(&metadata, None, &parts, err);
        }

        let (descriptor, captures) = match self.resolve(&parts.method, path, &metadata) {
            Ok(found) => found,
            Err(e) => {
                tracing::debug!(method = %parts.method, path = %path, error = %e, "No endpoint matched");
                return self.fail(&metadata, None, &parts, DispatchError::Route(e));
            }
        };

        let name = descriptor.name();
        let observed = !self.settings.skip_endpoints.contains(&name);
        let span = spans::server_span(&name, observed && self.settings.tracing_enabled);
        let inflight = (observed && self.settings.metrics_enabled).then(|| InflightGuard::new(&name));
        let started = Instant::now();

        let response = self
            .invoke(parts, body, metadata, &descriptor, &name, captures)
            .instrument(span.clone())
            .await;

        let status = response.status();
        spans::record_status(&span, status);
        if inflight.is_some() {
            metrics::record_request(&name, status, started.elapsed());
        }
        response
    }

    /// MATCH: router first, then the RPC fallback through the endpoint
    /// header. With the fallback enabled every failure is a `NotFound`.
    fn resolve(
        &self,
        method: &Method,
        path: &str,
        md: &Metadata,
    ) -> Result<(Arc<EndpointDescriptor>, Captures), RouteError> {
        let err = match self.router.search(method, path) {
            Ok(m) => return Ok((Arc::clone(m.value), m.captures)),
            Err(e) => e,
        };
        if !self.settings.register_rpc {
            return Err(err);
        }

        let endpoint = md
            .get(&self.settings.endpoint_header)
            .map(str::trim)
            .filter(|e| {
                e.split_once('.').is_some_and(|(service, method)| {
                    !service.is_empty() && !method.is_empty() && !method.contains('.')
                })
            })
            .ok_or(RouteError::NotFound)?;

        let m = self
            .router
            .search(&Method::POST, &format!("/{endpoint}"))
            .map_err(|_| RouteError::NotFound)?;
        tracing::trace!(endpoint = %endpoint, "Resolved through endpoint header");
        Ok((Arc::clone(m.value), m.captures))
    }

    async fn invoke(
        &self,
        parts: Parts,
        body: Body,
        metadata: Metadata,
        descriptor: &EndpointDescriptor,
        name: &str,
        captures: Captures,
    ) -> Response<Body> {
        let content_type = metadata
            .get(CONTENT_TYPE.as_str())
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or(self.settings.default_content_type.as_str())
            .to_string();

        let codec = match self.codecs.lookup(&content_type) {
            Ok(codec) => codec,
            Err(e) => {
                let err = DispatchError::UnsupportedContentType(e);
                return self.fail(&metadata, Some(descriptor), &parts, err);
            }
        };

        let bytes = match axum::body::to_bytes(body, self.settings.max_body_bytes).await {
            Ok(bytes) => bytes,
            Err(e) => return self.fail(&metadata, Some(descriptor), &parts, DispatchError::Body(e)),
        };
        let decoded = if bytes.is_empty() {
            None
        } else {
            match codec.decode(&bytes) {
                Ok(value) => Some(value),
                Err(e) => return self.fail(&metadata, Some(descriptor), &parts, DispatchError::Decode(e)),
            }
        };

        let params = merge::collect(&captures, parts.uri.query());
        let Argument { value, typed } = match descriptor.invoker.prepare(decoded, &params, &self.merge_options) {
            Ok(argument) => argument,
            Err(e) => return self.fail(&metadata, Some(descriptor), &parts, DispatchError::Merge(e)),
        };

        let mut ctx = Context::new(metadata);
        ctx.set_endpoint(name);
        let request = RpcRequest::new(
            &self.settings.service_name,
            name,
            &content_type,
            ctx.incoming_shared(),
            value,
        )
        .with_boxed_argument(typed);

        let handler = self.chain.wrap(descriptor.invoker.handler());
        let Reply { context, result } = handler(ctx, request).await;
        if let Err(e) = &result {
            tracing::debug!(endpoint = %name, error = %e, "Handler returned error");
        }

        // Form requests are answered in the default codec.
        let mut response_type = content_type;
        let mut response_codec = codec;
        if media_type(&response_type) == FORM_CONTENT_TYPE {
            match self.codecs.lookup(DEFAULT_CONTENT_TYPE) {
                Ok(c) => {
                    response_codec = c;
                    response_type = DEFAULT_CONTENT_TYPE.to_string();
                }
                Err(e) => {
                    let err = DispatchError::ResponseContentType(e);
                    return self.fail(context.incoming(), Some(descriptor), &parts, err);
                }
            }
        }
        if let Some(ct) = context.content_type_override() {
            if media_type(ct) != media_type(&response_type) {
                match self.codecs.lookup(ct) {
                    Ok(c) => response_codec = c,
                    Err(e) => {
                        let err = DispatchError::ResponseContentType(e);
                        return self.fail(context.incoming(), Some(descriptor), &parts, err);
                    }
                }
            }
            response_type = ct.to_string();
        }

        let (mut status, payload) = match result {
            Ok(value) => (StatusCode::OK, value),
            Err(err) => err.classify(self.settings.wrapped_error_status),
        };

        let body = match response_codec.encode(&payload) {
            Ok(bytes) => {
                if let Some(forced) = context.response().status() {
                    status = forced;
                }
                Body::from(bytes)
            }
            Err(e) => {
                tracing::error!(endpoint = %name, codec = response_codec.name(), error = %e, "Failed to encode response");
                status = StatusCode::INTERNAL_SERVER_ERROR;
                Body::empty()
            }
        };

        build_response(status, &response_type, &context, body)
    }

    fn fail(
        &self,
        metadata: &Metadata,
        endpoint: Option<&EndpointDescriptor>,
        parts: &Parts,
        err: DispatchError,
    ) -> Response<Body> {
        let status = err.status();
        if status.is_server_error() {
            tracing::error!(uri = %parts.uri, status = status.as_u16(), error = %err, "Request failed before invocation");
        } else {
            tracing::debug!(uri = %parts.uri, status = status.as_u16(), error = %err, "Request rejected");
        }
        let ctx = ErrorContext {
            metadata,
            endpoint,
            parts,
        };
        (self.error_handler)(&ctx, &err, status)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("settings", &self.settings)
            .field("routes", &self.router.len())
            .field("chain", &self.chain)
            .finish()
    }
}

/// INIT: request headers plus transport fields.
fn incoming_metadata(parts: &Parts) -> Metadata {
    let mut md = Metadata::new();
    for (name, value) in &parts.headers {
        md.append(name.as_str(), String::from_utf8_lossy(value.as_bytes()));
    }

    if let Some(ConnectInfo(addr)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
        md.set("RemoteAddr", addr.to_string());
    }

    let tls = parts.extensions.get::<TlsInfo>();
    let scheme = match (parts.uri.scheme_str(), tls) {
        (Some(s), _) => s,
        (None, Some(_)) => "https",
        (None, None) => "http",
    };
    md.set("Scheme", scheme);
    if let Some(tls) = tls {
        if let Some(alpn) = &tls.alpn {
            md.set("Tls-Alpn", alpn.as_str());
        }
        if let Some(server_name) = &tls.server_name {
            md.set("Tls-Server-Name", server_name.as_str());
        }
    }

    md.set("Method", parts.method.as_str());
    md.set("URL", parts.uri.to_string());
    md.set("Proto", format!("{:?}", parts.version));

    let host = parts
        .headers
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .or_else(|| parts.uri.authority().map(|a| a.to_string()));
    if let Some(host) = host {
        md.set("Host", host);
    }
    md.set(
        "RequestURI",
        parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path().to_string(), |pq| pq.to_string()),
    );
    md
}

/// WRITE: content type first, then outgoing metadata (set), then response
/// state headers (append).
fn build_response(status: StatusCode, content_type: &str, ctx: &Context, body: Body) -> Response<Body> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    let headers = response.headers_mut();

    match HeaderValue::from_str(content_type) {
        Ok(v) => {
            headers.insert(CONTENT_TYPE, v);
        }
        Err(_) => tracing::warn!(content_type = %content_type, "Invalid content type header"),
    }

    for (key, values) in ctx.outgoing().iter() {
        if key.eq_ignore_ascii_case(CONTENT_TYPE.as_str()) {
            continue;
        }
        let Ok(name) = HeaderName::from_bytes(key.as_bytes()) else {
            tracing::warn!(header = %key, "Skipping invalid outgoing header name");
            continue;
        };
        headers.remove(&name);
        for value in values {
            match HeaderValue::from_str(value) {
                Ok(v) => {
                    headers.append(name.clone(), v);
                }
                Err(_) => tracing::warn!(header = %key, "Skipping invalid outgoing header value"),
            }
        }
    }

    for (key, value) in ctx.response().headers() {
        if key.eq_ignore_ascii_case(CONTENT_TYPE.as_str()) {
            continue;
        }
        match (HeaderName::from_bytes(key.as_bytes()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(v)) => {
                headers.append(name, v);
            }
            _ => tracing::warn!(header = %key, "Skipping invalid response header"),
        }
    }

    response
}
