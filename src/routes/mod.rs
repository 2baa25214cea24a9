// Routes module - the static route table and the axum router built from it
//
// Declared routes go to their backend. Everything else, including a declared
// path hit with an undeclared method, falls through to the app backend, so the
// gateway itself never answers 404 or 405.

use std::collections::BTreeMap;

use axum::{
    http::{header, Method},
    routing::{get, MethodFilter, MethodRouter},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::app_state::SharedState;
use crate::config::Backend;
use crate::handlers::{health_check, proxy_app, proxy_auth};

// ===== ROUTE TABLE =====

#[derive(Debug, Clone)]
pub struct RouteEntry {
    pub method: MethodFilter,
    /// axum path syntax; `:id` is a single opaque segment
    pub path: &'static str,
    pub backend: Backend,
}

pub const ROUTE_TABLE: &[RouteEntry] = &[
    // Auth service
    RouteEntry { method: MethodFilter::POST, path: "/api/auth/register", backend: Backend::Auth },
    RouteEntry { method: MethodFilter::POST, path: "/api/auth/login", backend: Backend::Auth },
    RouteEntry { method: MethodFilter::POST, path: "/api/auth/refresh", backend: Backend::Auth },
    // App service
    RouteEntry { method: MethodFilter::POST, path: "/api/images/upload", backend: Backend::App },
    RouteEntry { method: MethodFilter::GET, path: "/api/images", backend: Backend::App },
    RouteEntry { method: MethodFilter::GET, path: "/api/images/:id", backend: Backend::App },
    RouteEntry { method: MethodFilter::GET, path: "/api/images/:id/status", backend: Backend::App },
];

impl RouteEntry {
    pub fn method_name(&self) -> &'static str {
        if self.method == MethodFilter::GET {
            "GET"
        } else if self.method == MethodFilter::POST {
            "POST"
        } else {
            "*"
        }
    }
}

/// Print the route table (call on startup)
pub fn log_routes() {
    tracing::info!("GET  /health -> gateway");
    for entry in ROUTE_TABLE {
        tracing::info!("{:<4} {} -> {}", entry.method_name(), entry.path, entry.backend.name());
    }
    tracing::info!("*    /* -> {} (catch-all)", Backend::App.name());
}

// ===== ROUTER =====

pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

pub fn build_router(state: SharedState) -> Router {
    // Entries that share a path become one method router
    let mut by_path: BTreeMap<&'static str, MethodRouter<SharedState>> = BTreeMap::new();
    for entry in ROUTE_TABLE {
        let method_router = by_path.remove(entry.path).unwrap_or_else(MethodRouter::new);
        let method_router = match entry.backend {
            Backend::Auth => method_router.on(entry.method, proxy_auth),
            Backend::App => method_router.on(entry.method, proxy_app),
        };
        by_path.insert(entry.path, method_router);
    }

    let mut router: Router<SharedState> =
        Router::new().route("/health", get(health_check).fallback(proxy_app));
    for (path, method_router) in by_path {
        router = router.route(path, method_router.fallback(proxy_app));
    }

    // Last layer is outermost: CORS wraps the access log and every handler
    router
        .fallback(proxy_app)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer())
        .with_state(state)
}
