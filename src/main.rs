// Gateway Service - Main Entry Point
// Single entry point in front of the auth and app services

use std::net::SocketAddr;

use gateway_service::{build_router, logging, routes, AppState, GatewayConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    logging::init();

    let config = match GatewayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };
    config.log_summary();
    routes::log_routes();

    let port = config.port;
    let state = match AppState::shared(config) {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "failed to initialize gateway");
            std::process::exit(1);
        }
    };

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(%addr, error = %e, "failed to bind listener");
            std::process::exit(1);
        }
    };

    info!("Gateway listening on port {}", port);

    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal());

    if let Err(e) = server.await {
        error!(error = %e, "server error");
        std::process::exit(1);
    }

    info!("Gateway stopped");
}

/// Resolves on Ctrl-C or SIGTERM; in-flight requests are allowed to finish
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
