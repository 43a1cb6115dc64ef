//! Logging setup built on `tracing-subscriber`.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "debug,wgpu_core=info,wgpu_hal=info,naga=info";

/// Install the global fmt subscriber.
///
/// Honors `RUST_LOG` when present, otherwise falls back to a filter that keeps
/// the wgpu internals quiet.
///
/// # Panics
///
/// Panics if a global subscriber has already been installed.
pub fn init() {
    tracing_subscriber::fmt().with_env_filter(env_filter()).init();
}

/// Install the global fmt subscriber unless one already exists.
///
/// Intended for tests, where every test may race to initialize logging.
/// Output goes through the test writer so it is captured per test.
pub fn try_init() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_test_writer()
        .try_init()
        .is_ok()
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
