//! Subscriber setup for binaries and demos.

use tracing_subscriber::EnvFilter;

/// Install a formatting subscriber filtered by `RUST_LOG`, falling back to
/// `warn`. Calling it again is harmless.
pub fn init() {
    init_with_default("warn");
}

/// Like [`init`] with a custom fallback directive.
pub fn init_with_default(directive: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    // A subscriber may already be installed (tests, embedding apps).
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
