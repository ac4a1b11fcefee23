//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (status codes, body limits)
//! - Check that header names and media types are well formed
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::HeaderName;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::schema::ServerConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.name.trim().is_empty() {
        errors.push(ValidationError::new("name", "must not be empty"));
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("invalid socket address {:?}", config.listener.bind_address),
        ));
    }

    let dispatch = &config.dispatch;
    if HeaderName::from_bytes(dispatch.endpoint_header.as_bytes()).is_err() {
        errors.push(ValidationError::new(
            "dispatch.endpoint_header",
            format!("invalid header name {:?}", dispatch.endpoint_header),
        ));
    }

    let media = dispatch.default_content_type.split(';').next().unwrap_or_default().trim();
    if !media.contains('/') || media.starts_with('/') || media.ends_with('/') {
        errors.push(ValidationError::new(
            "dispatch.default_content_type",
            format!("invalid media type {:?}", dispatch.default_content_type),
        ));
    }

    if !(100..=599).contains(&dispatch.wrapped_error_status) {
        errors.push(ValidationError::new(
            "dispatch.wrapped_error_status",
            format!("{} is not an HTTP status code", dispatch.wrapped_error_status),
        ));
    }

    if dispatch.max_body_bytes == 0 {
        errors.push(ValidationError::new("dispatch.max_body_bytes", "must be greater than 0"));
    }

    if EnvFilter::try_new(&config.observability.log_level).is_err() {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("invalid filter {:?}", config.observability.log_level),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
