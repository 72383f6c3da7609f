//! Log subscriber setup for binaries.

use tracing_subscriber::EnvFilter;

/// Installs a formatted `tracing` subscriber writing to stderr.
///
/// `RUST_LOG` takes precedence over `default_directive` (`"warn"`,
/// `"folio=debug"`, ...). Fails if a global subscriber is already set.
pub fn init(default_directive: &str) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_directive)),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to install log subscriber: {err}"))
}
