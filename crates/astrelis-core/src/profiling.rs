//! Profiling utilities based on the `puffin` crate.

pub use puffin::{GlobalProfiler, profile_function, profile_scope};

#[cfg(feature = "profiling")]
use std::sync::OnceLock;

/// Profiling backend options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfilingBackend {
    /// Only collect scopes in-process (no server).
    InProcess,
    /// Send profiling data to puffin_viewer via HTTP.
    #[cfg(feature = "profiling")]
    PuffinHttp,
}

/// Global profiling server instance.
#[cfg(feature = "profiling")]
static PROFILING_SERVER: OnceLock<puffin_http::Server> = OnceLock::new();

/// Initialize profiling with the specified backend.
///
/// # Example
/// ```no_run
/// use astrelis_core::profiling::{init_profiling, ProfilingBackend};
///
/// init_profiling(ProfilingBackend::InProcess);
/// ```
pub fn init_profiling(backend: ProfilingBackend) {
    puffin::set_scopes_on(true);

    match backend {
        ProfilingBackend::InProcess => {
            tracing::info!("Puffin scopes enabled (in-process only)");
        }
        #[cfg(feature = "profiling")]
        ProfilingBackend::PuffinHttp => {
            // Start the puffin server on the default port (8585)
            match puffin_http::Server::new("0.0.0.0:8585") {
                Ok(server) => {
                    tracing::info!("Puffin profiler server started on http://0.0.0.0:8585");
                    tracing::info!("Connect puffin_viewer or open browser to view profiling data");

                    // Store the server in a static to keep it alive
                    let _ = PROFILING_SERVER.set(server);
                }
                Err(e) => {
                    tracing::error!("Failed to start puffin server: {}", e);
                }
            }
        }
    }
}

/// Whether profiling scopes are currently being recorded.
#[inline]
pub fn is_enabled() -> bool {
    puffin::are_scopes_on()
}

/// Mark the start of a new frame for profiling.
///
/// Call this once per frame in your main loop to organize profiling data by frame.
///
/// # Example
/// ```no_run
/// use astrelis_core::profiling::new_frame;
///
/// loop {
///     new_frame();
///     // ... your frame code ...
/// }
/// ```
#[inline]
pub fn new_frame() {
    puffin::GlobalProfiler::lock().new_frame();
}
