//! Log subscriber setup for processes hosting the engine.

use tracing_subscriber::EnvFilter;

use crate::config::Settings;

/// `RUST_LOG` when it is set and parses, otherwise `level`.
fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install a formatted subscriber filtered by `RUST_LOG`, or `level` when unset.
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_filter(level))
        .with_target(true)
        .try_init();
}

/// Install the subscriber using the `[logging]` section of `settings`.
pub fn init_from(settings: &Settings) {
    init(&settings.logging.level);
}
