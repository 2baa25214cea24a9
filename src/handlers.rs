// HTTP request handlers for the gateway

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

use crate::app_state::{AppState, SharedState};
use crate::config::Backend;
use crate::proxy;

// ===== HEALTH =====

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// GET /health
/// Answered locally, never touches a backend
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Gateway is running",
    })
}

// ===== PROXY =====

/// /api/auth/* → auth backend
pub async fn proxy_auth(
    State(state): State<SharedState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
) -> Response {
    proxy_to(&state, Backend::Auth, connect_info, request).await
}

/// /api/images/* and every unmatched request → app backend
pub async fn proxy_app(
    State(state): State<SharedState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
) -> Response {
    proxy_to(&state, Backend::App, connect_info, request).await
}

async fn proxy_to(
    state: &AppState,
    backend: Backend,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let client_ip = connect_info.map(|ConnectInfo(addr)| addr.ip());

    match proxy::forward(state, backend, client_ip, request).await {
        Ok(response) => response,
        Err(err) => {
            tracing::error!(
                backend = err.backend(),
                %method,
                path = %path,
                error = %err,
                "failed to forward request"
            );
            err.into_response()
        }
    }
}
