// Gateway configuration, read once from the process environment at startup

use std::time::Duration;

use crate::error::ConfigError;

// ============================================================================
// CONSTANTS
// ============================================================================

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_AUTH_SERVICE_URL: &str = "http://localhost:3001";
pub const DEFAULT_APP_SERVICE_URL: &str = "http://localhost:3002";

/// Default time a backend has to start answering (response headers)
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// BACKENDS
// ============================================================================

/// The two downstream services the gateway knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Auth,
    App,
}

impl Backend {
    pub fn name(self) -> &'static str {
        match self {
            Backend::Auth => "auth",
            Backend::App => "app",
        }
    }
}

/// A named downstream base URL.
///
/// The URL is kept as the raw configured string and only parsed when a
/// request is forwarded, so a malformed value fails that request instead of
/// the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendTarget {
    pub name: &'static str,
    pub base_url: String,
}

// ============================================================================
// GATEWAY CONFIG
// ============================================================================

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub port: u16,
    pub auth_service: BackendTarget,
    pub app_service: BackendTarget,
    /// `None` disables the time-to-response-headers limit
    pub upstream_timeout: Option<Duration>,
}

impl GatewayConfig {
    /// Load `.env` (if any) and read the gateway variables from the environment
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable source.
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw))?,
            None => DEFAULT_PORT,
        };

        let upstream_timeout = match get("UPSTREAM_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidTimeout(raw))?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => Some(Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS)),
        };

        Ok(Self {
            port,
            auth_service: BackendTarget {
                name: Backend::Auth.name(),
                base_url: get("AUTH_SERVICE_URL")
                    .unwrap_or_else(|| DEFAULT_AUTH_SERVICE_URL.to_string()),
            },
            app_service: BackendTarget {
                name: Backend::App.name(),
                base_url: get("APP_SERVICE_URL")
                    .unwrap_or_else(|| DEFAULT_APP_SERVICE_URL.to_string()),
            },
            upstream_timeout,
        })
    }

    pub fn target(&self, backend: Backend) -> &BackendTarget {
        match backend {
            Backend::Auth => &self.auth_service,
            Backend::App => &self.app_service,
        }
    }

    /// Log the effective configuration (call on startup)
    pub fn log_summary(&self) {
        tracing::info!(backend = self.auth_service.name, url = %self.auth_service.base_url, "auth backend configured");
        tracing::info!(backend = self.app_service.name, url = %self.app_service.base_url, "app backend configured");
        match self.upstream_timeout {
            Some(timeout) => tracing::info!(timeout_secs = timeout.as_secs(), "upstream response timeout enabled"),
            None => tracing::warn!("upstream response timeout disabled"),
        }
    }
}
