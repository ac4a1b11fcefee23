//! Error types of the dispatch pipeline.
//!
//! Two families:
//! - [`DispatchError`]: failures before the handler runs. They go through
//!   the [`ErrorHandler`] and never reach a codec.
//! - [`HandlerError`]: what a handler returns. It is classified into a
//!   status and a payload that is encoded like a normal reply.

use std::sync::Arc;

use axum::body::Body;
use axum::http::request::Parts;
use axum::http::{Response, StatusCode};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::codec::CodecError;
use crate::endpoint::EndpointDescriptor;
use crate::merge::MergeError;
use crate::metadata::Metadata;
use crate::routing::RouteError;

/// Structured application error carrying its own HTTP status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{message} (code {code})")]
pub struct StatusError {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub code: u16,
    pub message: String,
}

impl StatusError {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            code: code.as_u16(),
            message: message.into(),
        }
    }

    /// Attach an error id (usually the service name).
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Status to respond with; out-of-range codes become 500.
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// Error returned by a bound method.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Encoded as-is with its own status.
    #[error(transparent)]
    Status(#[from] StatusError),

    /// Opaque payload encoded verbatim with the configured wrapped-error
    /// status.
    #[error("wrapped error: {0}")]
    Wrapped(Value),

    /// Anything else; answered with 500.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    /// Wrap a serializable payload as the response body.
    pub fn wrap<T: Serialize>(payload: &T) -> Self {
        match serde_json::to_value(payload) {
            Ok(value) => HandlerError::Wrapped(value),
            Err(e) => HandlerError::Other(Box::new(e)),
        }
    }

    pub fn other(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        HandlerError::Other(err.into())
    }

    /// Status and payload for this error.
    pub(crate) fn classify(self, wrapped_status: StatusCode) -> (StatusCode, Value) {
        match self {
            HandlerError::Status(err) => {
                let status = err.status();
                let body = serde_json::to_value(&err).unwrap_or(Value::Null);
                (status, body)
            }
            HandlerError::Wrapped(value) => (wrapped_status, value),
            HandlerError::Other(err) => {
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                let body = serde_json::json!({
                    "code": status.as_u16(),
                    "message": err.to_string(),
                });
                (status, body)
            }
        }
    }
}

/// Failure before the handler runs.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("{0}")]
    Route(RouteError),

    #[error("unsupported content type: {0}")]
    UnsupportedContentType(CodecError),

    #[error("failed to read request body: {0}")]
    Body(#[source] axum::Error),

    #[error("failed to decode request body: {0}")]
    Decode(CodecError),

    #[error("invalid request parameters: {0}")]
    Merge(#[from] MergeError),

    #[error("unsupported response content type: {0}")]
    ResponseContentType(CodecError),
}

impl DispatchError {
    /// HTTP status this failure maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::InvalidPath(_) => StatusCode::BAD_REQUEST,
            DispatchError::Route(RouteError::NotFound) => StatusCode::NOT_FOUND,
            DispatchError::Route(RouteError::MethodNotAllowed) => StatusCode::METHOD_NOT_ALLOWED,
            DispatchError::UnsupportedContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            DispatchError::Body(err) => {
                if is_length_limit(err) {
                    StatusCode::PAYLOAD_TOO_LARGE
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }
            DispatchError::Decode(_) | DispatchError::Merge(_) | DispatchError::ResponseContentType(_) => {
                StatusCode::BAD_REQUEST
            }
        }
    }
}

fn is_length_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        if e.is::<http_body_util::LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}

/// What an [`ErrorHandler`] knows about the failed request.
#[derive(Debug)]
pub struct ErrorContext<'a> {
    /// Incoming metadata collected so far.
    pub metadata: &'a Metadata,
    /// Matched endpoint; `None` when routing failed.
    pub endpoint: Option<&'a EndpointDescriptor>,
    pub parts: &'a Parts,
}

/// Writes the response for a pre-invocation failure.
pub type ErrorHandler =
    Arc<dyn Fn(&ErrorContext<'_>, &DispatchError, StatusCode) -> Response<Body> + Send + Sync>;

/// Status line plus the error text as a plain body.
pub fn default_error_handler() -> ErrorHandler {
    Arc::new(
        |_ctx: &ErrorContext<'_>, err: &DispatchError, status: StatusCode| {
            (status, err.to_string()).into_response()
        },
    )
}
