//! Per-request response state written by handlers.

use axum::http::StatusCode;

/// Status and headers a handler wants on its response.
///
/// A fresh value is created for every request and owned by that request's
/// [`Context`](super::Context); only the handler chain writes to it.
#[derive(Debug, Clone, Default)]
pub struct ResponseState {
    status: Option<StatusCode>,
    headers: Vec<(String, String)>,
}

impl ResponseState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force the response status, overriding error classification.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    /// Status set by the handler, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Add a response header; repeated names produce repeated headers.
    pub fn append_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    /// Values appended under `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
}
