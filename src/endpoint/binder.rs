//! Binding an endpoint table onto the router.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::http::Method;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::descriptor::{EndpointDescriptor, Handler};
use crate::routing::{InsertError, PathPattern, Router};

/// Route metadata of one endpoint, as found in service definitions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointMeta {
    #[serde(rename = "Path")]
    pub path: String,
    /// One verb, or several separated by commas.
    #[serde(rename = "Method")]
    pub method: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl EndpointMeta {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: method.into(),
            extra: BTreeMap::new(),
        }
    }
}

/// Endpoint name (`Service.Method`) → route metadata.
pub type EndpointTable = BTreeMap<String, EndpointMeta>;

#[derive(Debug, Clone, Copy, Default)]
pub struct BindOptions {
    /// Also bind every endpoint under `POST /Service.Method`.
    pub register_rpc: bool,
}

/// What happened to each table entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindReport {
    /// Endpoint names now routable.
    pub bound: Vec<String>,
    /// Entries dropped because they were malformed.
    pub skipped: Vec<String>,
}

#[derive(Debug, Error)]
pub enum BindError {
    #[error("endpoint {endpoint}: {source}")]
    Conflict {
        endpoint: String,
        #[source]
        source: InsertError,
    },
}

/// Bind every entry of `table` to the matching method of `handler`.
///
/// The method is the part of the entry name after the last `.`. Entries
/// naming an unknown method, carrying an invalid path or an invalid verb
/// are logged and skipped. A route already taken by another endpoint
/// fails the whole call.
pub fn bind<S>(
    handler: &Handler<S>,
    table: &EndpointTable,
    router: &mut Router<Arc<EndpointDescriptor>>,
    options: BindOptions,
) -> Result<BindReport, BindError> {
    let mut report = BindReport::default();

    for (name, meta) in table {
        let method_name = name.rsplit('.').next().unwrap_or(name);

        let Some(invoker) = handler.lookup(method_name) else {
            tracing::error!(endpoint = %name, method = %method_name, service = handler.name(), "No such method on handler");
            report.skipped.push(name.clone());
            continue;
        };

        let pattern = match PathPattern::parse(&meta.path) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(endpoint = %name, path = %meta.path, error = %e, "Invalid path pattern");
                report.skipped.push(name.clone());
                continue;
            }
        };

        let verbs = match parse_verbs(&meta.method) {
            Some(v) => v,
            None => {
                tracing::error!(endpoint = %name, method = %meta.method, "Invalid HTTP method");
                report.skipped.push(name.clone());
                continue;
            }
        };

        let descriptor = Arc::new(EndpointDescriptor {
            service: handler.name().to_string(),
            method: method_name.to_string(),
            argument_type: invoker.argument_type(),
            reply_type: invoker.reply_type(),
            invoker,
        });

        router
            .insert(&verbs, &pattern, Arc::clone(&descriptor))
            .map_err(|source| BindError::Conflict {
                endpoint: name.clone(),
                source,
            })?;

        tracing::debug!(
            endpoint = %descriptor.name(),
            path = %meta.path,
            method = %meta.method,
            "Endpoint bound"
        );

        if options.register_rpc {
            bind_rpc_alias(router, &descriptor);
        }
        report.bound.push(name.clone());
    }

    Ok(report)
}

fn bind_rpc_alias(router: &mut Router<Arc<EndpointDescriptor>>, descriptor: &Arc<EndpointDescriptor>) {
    let alias = format!("/{}", descriptor.name());
    let pattern = match PathPattern::parse(&alias) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(alias = %alias, error = %e, "Cannot build RPC alias");
            return;
        }
    };
    if let Err(e) = router.insert(&[Method::POST], &pattern, Arc::clone(descriptor)) {
        tracing::warn!(alias = %alias, error = %e, "RPC alias already bound");
    }
}

fn parse_verbs(raw: &str) -> Option<Vec<Method>> {
    let verbs = raw
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| Method::from_bytes(v.to_ascii_uppercase().as_bytes()).ok())
        .collect::<Option<Vec<_>>>()?;
    (!verbs.is_empty()).then_some(verbs)
}
