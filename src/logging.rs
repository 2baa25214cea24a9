// Tracing initialization (stderr/stdout fmt subscriber, RUST_LOG aware)

use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Install the global subscriber. Safe to call more than once.
pub fn init() {
    TRACING_INIT.get_or_init(|| {
        let result = tracing_subscriber::fmt()
            .with_env_filter(default_env_filter())
            .with_target(false)
            .with_thread_ids(true)
            .try_init();
        if let Err(err) = result {
            eprintln!("tracing init failed: {err}");
        }
    });
}

fn default_env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        #[cfg(debug_assertions)]
        {
            EnvFilter::new("info,gateway_service=debug")
        }
        #[cfg(not(debug_assertions))]
        {
            EnvFilter::new("info")
        }
    })
}
