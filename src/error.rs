// Error types for the gateway
//
// ConfigError is startup-only and fatal. GatewayError is per-request and is
// turned into a JSON error response; it never takes the process down.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

// ============================================================================
// CONFIG ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// PORT is not a valid TCP port
    InvalidPort(String),
    /// UPSTREAM_TIMEOUT_SECS is not a whole number of seconds
    InvalidTimeout(String),
    /// The shared HTTP client could not be built
    HttpClient(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidPort(raw) => write!(f, "invalid PORT value: {:?}", raw),
            ConfigError::InvalidTimeout(raw) => {
                write!(f, "invalid UPSTREAM_TIMEOUT_SECS value: {:?}", raw)
            }
            ConfigError::HttpClient(msg) => write!(f, "failed to build HTTP client: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// REQUEST ERRORS
// ============================================================================

#[derive(Debug)]
pub enum GatewayError {
    /// Backend base URL could not be parsed into a usable http(s) URL
    InvalidServiceUrl { backend: &'static str, url: String },
    /// Backend did not answer within the configured timeout
    UpstreamTimeout { backend: &'static str },
    /// Connection refused, reset, or any other transport failure
    UpstreamUnavailable { backend: &'static str, message: String },
}

impl GatewayError {
    /// Classify a client failure. A connect that hit the connect timeout is a
    /// timeout; everything else is an unavailable backend.
    pub fn from_upstream(backend: &'static str, err: &(dyn std::error::Error + 'static)) -> Self {
        if caused_by_timeout(err) {
            return GatewayError::UpstreamTimeout { backend };
        }
        let mut message = err.to_string();
        if let Some(source) = err.source() {
            message = format!("{}: {}", message, source);
        }
        GatewayError::UpstreamUnavailable { backend, message }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::InvalidServiceUrl { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::UpstreamUnavailable { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    /// Message shown to the caller. Details stay in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            GatewayError::InvalidServiceUrl { .. } => "Invalid service URL",
            GatewayError::UpstreamTimeout { .. } => "Upstream service timed out",
            GatewayError::UpstreamUnavailable { .. } => "Upstream service unavailable",
        }
    }

    pub fn backend(&self) -> &'static str {
        match self {
            GatewayError::InvalidServiceUrl { backend, .. }
            | GatewayError::UpstreamTimeout { backend }
            | GatewayError::UpstreamUnavailable { backend, .. } => backend,
        }
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayError::InvalidServiceUrl { backend, url } => {
                write!(f, "invalid {} service URL: {:?}", backend, url)
            }
            GatewayError::UpstreamTimeout { backend } => {
                write!(f, "{} service did not respond in time", backend)
            }
            GatewayError::UpstreamUnavailable { backend, message } => {
                write!(f, "{} service unavailable: {}", backend, message)
            }
        }
    }
}

impl std::error::Error for GatewayError {}

fn caused_by_timeout(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::TimedOut {
                return true;
            }
        }
        current = err.source();
    }
    false
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.public_message() }))).into_response()
    }
}
