// Application state shared by every request handler

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use hyper_tls::HttpsConnector;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::GatewayConfig;
use crate::error::ConfigError;

/// Time allowed for establishing a TCP (and TLS) connection to a backend
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

pub type SharedState = Arc<AppState>;

/// Pooled HTTP/1.1 client, plain http or https.
/// Takes the request URI as given, so paths are never re-normalised, and never
/// follows redirects.
pub type UpstreamClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Read-only after startup; requests never write to it, so no lock is needed.
pub struct AppState {
    pub config: GatewayConfig,
    /// Pooled client used for every forwarded request
    pub client: UpstreamClient,
}

impl AppState {
    pub fn new(config: GatewayConfig) -> Result<Self, ConfigError> {
        let mut http = HttpConnector::new();
        // https URIs are handed to the TLS layer wrapped around this connector
        http.enforce_http(false);
        http.set_connect_timeout(Some(Duration::from_secs(CONNECT_TIMEOUT_SECS)));

        let tls = native_tls::TlsConnector::new()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        let https = HttpsConnector::from((http, tokio_native_tls::TlsConnector::from(tls)));

        let client = Client::builder(TokioExecutor::new()).build(https);

        Ok(Self { config, client })
    }

    pub fn shared(config: GatewayConfig) -> Result<SharedState, ConfigError> {
        Self::new(config).map(Arc::new)
    }
}
