//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files and
//! default every field, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};

/// Root configuration for the server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Service name reported on every request descriptor.
    pub name: String,

    /// Listener configuration.
    pub listener: ListenerConfig,

    /// Dispatch pipeline settings.
    pub dispatch: DispatchConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "rpc-http-server".to_string(),
            listener: ListenerConfig::default(),
            dispatch: DispatchConfig::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Dispatch pipeline settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Bind every endpoint a second time under `POST /Service.Method` and
    /// resolve unmatched requests through the endpoint header.
    pub register_rpc: bool,

    /// Header carrying `Service.Method` for RPC-style requests.
    pub endpoint_header: String,

    /// Content type assumed when a request carries none.
    pub default_content_type: String,

    /// Status for errors a handler returned through `HandlerError::wrap`.
    pub wrapped_error_status: u16,

    /// Largest request body read, in bytes.
    pub max_body_bytes: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            register_rpc: false,
            endpoint_header: "Micro-Endpoint".to_string(),
            default_content_type: "application/json".to_string(),
            wrapped_error_status: 200,
            max_body_bytes: 4 * 1024 * 1024,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total request timeout in seconds, applied by the transport. 0 disables.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    pub log_level: String,

    pub log_format: LogFormat,

    /// Record request metrics through the `metrics` facade.
    pub metrics_enabled: bool,

    /// Open a server span per dispatched call.
    pub tracing_enabled: bool,

    /// Endpoints (`Service.Method`) that get neither spans nor metrics.
    pub skip_endpoints: Vec<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            tracing_enabled: true,
            skip_endpoints: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.dispatch.endpoint_header, "Micro-Endpoint");
        assert_eq!(config.dispatch.wrapped_error_status, 200);
        assert!(!config.dispatch.register_rpc);
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_partial_sections() {
        let config: ServerConfig = toml::from_str(
            r#"
            name = "items"

            [dispatch]
            register_rpc = true
            wrapped_error_status = 422

            [observability]
            log_format = "json"
            skip_endpoints = ["Health.Check"]
            "#,
        )
        .unwrap();
        assert_eq!(config.name, "items");
        assert!(config.dispatch.register_rpc);
        assert_eq!(config.dispatch.wrapped_error_status, 422);
        assert_eq!(config.dispatch.default_content_type, "application/json");
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.observability.skip_endpoints, ["Health.Check"]);
        assert_eq!(config.timeouts.request_secs, 30);
    }
}
