use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global subscriber: `RUST_LOG` when set, otherwise
/// "snaptex=debug,warn".
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("snaptex=debug,warn"));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
