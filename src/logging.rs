//! Logging init for binaries and tests embedding the resolver.

use tracing_subscriber::EnvFilter;

/// Initializes env-filtered stderr logging.
///
/// Field-level resolution failures log at debug; raise the filter with
/// `RUST_LOG=manifest_prefill=debug` to see why a field came back absent.
pub fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,manifest_prefill=debug"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}
