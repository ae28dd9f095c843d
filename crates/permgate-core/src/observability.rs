// Tracing initialization with a configurable level.
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global subscriber at `info` unless `RUST_LOG` is set.
pub fn init_tracing() {
    init_tracing_with_level("info");
}

/// Install the global subscriber with `level` as the fallback filter.
///
/// `RUST_LOG`, when set and parsable, takes precedence. Calling this more
/// than once is harmless; later calls leave the first subscriber in place.
pub fn init_tracing_with_level(level: &str) {
    // Prefer RUST_LOG from env, otherwise use provided level string.
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|_| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .try_init();
}
