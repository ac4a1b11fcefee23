//! Request-scoped context threaded through middleware and handlers.

use std::sync::Arc;

use axum::http::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::response::ResponseState;
use crate::merge::{fill_request, FillOptions, MergeError};
use crate::metadata::Metadata;

/// Everything a handler can read about its request and write about its
/// response, besides the argument and reply themselves.
#[derive(Debug, Clone, Default)]
pub struct Context {
    incoming: Arc<Metadata>,
    outgoing: Metadata,
    response: ResponseState,
    endpoint: Option<String>,
}

impl Context {
    pub fn new(incoming: Metadata) -> Self {
        Self {
            incoming: Arc::new(incoming),
            ..Self::default()
        }
    }

    /// Request headers plus transport fields. Read-only.
    pub fn incoming(&self) -> &Metadata {
        &self.incoming
    }

    pub(crate) fn incoming_shared(&self) -> Arc<Metadata> {
        Arc::clone(&self.incoming)
    }

    /// Metadata copied verbatim into the response headers.
    pub fn outgoing(&self) -> &Metadata {
        &self.outgoing
    }

    pub fn outgoing_mut(&mut self) -> &mut Metadata {
        &mut self.outgoing
    }

    pub fn response(&self) -> &ResponseState {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut ResponseState {
        &mut self.response
    }

    /// Shorthand for `response_mut().set_status(..)`.
    pub fn set_status(&mut self, status: StatusCode) {
        self.response.set_status(status);
    }

    /// Shorthand for `response_mut().append_header(..)`.
    pub fn append_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.response.append_header(name, value);
    }

    /// Matched endpoint, `Service.Method`.
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub(crate) fn set_endpoint(&mut self, name: &str) {
        self.endpoint = Some(name.to_string());
    }

    /// Content type the handler asked for: outgoing metadata first, then
    /// the last `Content-Type` appended to the response state.
    pub fn content_type_override(&self) -> Option<&str> {
        self.outgoing
            .get("Content-Type")
            .or_else(|| self.response.header("Content-Type").last().copied())
    }

    /// Copy incoming headers and cookies into fields of `target`.
    pub fn fill_request<T>(&self, target: &mut T, options: &FillOptions) -> Result<(), MergeError>
    where
        T: Serialize + DeserializeOwned,
    {
        fill_request(target, &self.incoming, options)
    }
}
