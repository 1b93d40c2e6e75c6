//! Shared plumbing for the chario demo binaries.

use tracing_subscriber::EnvFilter;

/// Installs the fmt subscriber. `RUST_LOG` controls verbosity; log
/// lines go to stderr so the demos' stdout stays clean.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}
