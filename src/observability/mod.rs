//! Tracing initialization for host integrations.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global tracing subscriber.
///
/// Respects `RUST_LOG`; defaults to debug output for the bridge itself.
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jitsi_bridge=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
