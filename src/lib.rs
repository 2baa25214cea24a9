//! API gateway: routes /api/auth/* to the auth service, /api/images/* to the
//! app service, and everything else to the app service as a catch-all.
//! Exports all modules for use as a library crate

pub mod app_state;
pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod proxy;
pub mod routes;

pub use app_state::{AppState, SharedState};
pub use config::{Backend, BackendTarget, GatewayConfig};
pub use error::{ConfigError, GatewayError};
pub use routes::{build_router, RouteEntry, ROUTE_TABLE};
